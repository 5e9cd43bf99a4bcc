//! Periodic liveness messages on the keepalive topic.
//!
//! Fire-and-forget: one publish per interval while the session is up,
//! no retries.  When the session is down the slot is consumed silently.

use log::{debug, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{BrokerPort, EventSink, TimePort};
use crate::config::SystemConfig;
use crate::record::KeepaliveMessage;
use crate::supervisor::{ConnectivityState, ConnectivitySupervisor};
use crate::timers::ActivityClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveOutcome {
    NotDue,
    /// Interval elapsed but no session was up.
    Suppressed,
    Sent,
    Failed,
}

pub struct KeepaliveEmitter {
    interval_ms: u32,
    topic: heapless::String<64>,
    device: heapless::String<24>,
}

impl KeepaliveEmitter {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            interval_ms: config.keepalive_interval_ms,
            topic: config.keepalive_topic.clone(),
            device: config.device_name.clone(),
        }
    }

    pub fn tick(
        &self,
        supervisor: &ConnectivitySupervisor,
        broker: &mut impl BrokerPort,
        time: &impl TimePort,
        clock: &mut ActivityClock,
        sink: &mut impl EventSink,
    ) -> KeepaliveOutcome {
        if !clock.take_keepalive_slot(time.uptime_ms(), self.interval_ms) {
            return KeepaliveOutcome::NotDue;
        }
        if supervisor.state() != ConnectivityState::SessionUp || !broker.is_connected() {
            debug!("Keepalive: session down, skipped");
            return KeepaliveOutcome::Suppressed;
        }

        let payload = match KeepaliveMessage::new(&self.device, time.unix_secs()).to_json() {
            Ok(p) => p,
            Err(e) => {
                warn!("Keepalive: serialization failed: {}", e);
                sink.emit(&AppEvent::KeepaliveFailed);
                return KeepaliveOutcome::Failed;
            }
        };

        match broker.publish(&self.topic, payload.as_bytes()) {
            Ok(()) => {
                debug!("Keepalive: sent");
                sink.emit(&AppEvent::KeepaliveSent);
                KeepaliveOutcome::Sent
            }
            Err(e) => {
                warn!("Keepalive: publish failed: {}", e);
                sink.emit(&AppEvent::KeepaliveFailed);
                KeepaliveOutcome::Failed
            }
        }
    }
}
