//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART in production).  Each line starts with a
//! fixed tag so a serial capture can be grepped per concern.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | checkpoint ready"),
            AppEvent::LinkUp => info!("LINK  | up"),
            AppEvent::LinkLost => warn!("LINK  | lost"),
            AppEvent::LinkExhausted { attempts } => {
                error!("LINK  | not up after {} polls, restarting", attempts);
            }
            AppEvent::SessionUp { client_id } => info!("MQTT  | session up as '{}'", client_id),
            AppEvent::SessionLost => warn!("MQTT  | session lost"),
            AppEvent::SessionFailed { attempts } => {
                warn!("MQTT  | session failed after {} attempts", attempts);
            }
            AppEvent::IdleReconnect { idle_ms } => {
                info!("MQTT  | idle {} ms after activity, session cycled", idle_ms);
            }
            AppEvent::BadgeRejected { badge } => warn!("BADGE | unknown {}", badge),
            AppEvent::TapAccepted {
                badge,
                event_type,
                weight,
            } => info!("TAP   | {} {} weight={}", badge, event_type, weight),
            AppEvent::TapStoreFailed { badge } => {
                error!("TAP   | {} state not persisted, tap rejected", badge);
            }
            AppEvent::EventPublished { attempts } => {
                info!("PUB   | delivered (attempts={})", attempts);
            }
            AppEvent::EventDropped { attempts } => {
                error!("PUB   | dropped after {} attempts", attempts);
            }
            AppEvent::KeepaliveSent => info!("KEEP  | sent"),
            AppEvent::KeepaliveFailed => warn!("KEEP  | failed"),
        }
    }
}
