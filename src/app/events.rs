//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) and the components it
//! drives emit these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them; the
//! firmware logs them to the serial console.

use crate::badge::BadgeId;
use crate::tap_state::TapState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The main loop has started.
    Started,

    /// WiFi association completed.
    LinkUp,
    /// WiFi dropped; reassociation begins.
    LinkLost,
    /// Reassociation exhausted its attempts; a restart is required.
    LinkExhausted { attempts: u32 },

    /// Broker session established.
    SessionUp { client_id: heapless::String<40> },
    /// Transport reported the session dropped.
    SessionLost,
    /// All handshake attempts failed this cycle.
    SessionFailed { attempts: u32 },
    /// Idle timeout after activity forced a session cycle.
    IdleReconnect { idle_ms: u64 },

    /// A badge that maps to no mill was read.
    BadgeRejected { badge: BadgeId },
    /// A known badge was read, weighed and toggled.
    TapAccepted { badge: BadgeId, event_type: TapState, weight: i32 },
    /// Tap state could not be persisted; the tap produced no event.
    TapStoreFailed { badge: BadgeId },

    /// Tap event delivered.
    EventPublished { attempts: u32 },
    /// Tap event dropped after exhausting attempts (at-most-once).
    EventDropped { attempts: u32 },

    KeepaliveSent,
    KeepaliveFailed,
}
