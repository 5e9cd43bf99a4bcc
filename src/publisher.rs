//! At-most-once delivery of tap events.
//!
//! Each record gets `publish_attempts` tries.  An attempt is either a
//! publish call or, when no session is up, a reconnect cycle.  Failed
//! publishes back off `publish_backoff_ms` before the next try; nothing
//! waits after the last one.  After exhaustion the event is dropped and
//! logged; there is no queue.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{BrokerPort, EventSink, TimePort};
use crate::config::SystemConfig;
use crate::record::EventRecord;
use crate::retry::RetryPolicy;
use crate::supervisor::ConnectivitySupervisor;
use crate::timers::ActivityClock;

pub struct Publisher {
    policy: RetryPolicy,
    topic: heapless::String<64>,
}

impl Publisher {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            policy: config.publish_policy(),
            topic: config.event_topic.clone(),
        }
    }

    /// Consumes the record.  Returns `true` once the broker accepted it.
    pub fn publish(
        &self,
        record: EventRecord,
        supervisor: &mut ConnectivitySupervisor,
        broker: &mut impl BrokerPort,
        time: &mut impl TimePort,
        clock: &mut ActivityClock,
        sink: &mut impl EventSink,
    ) -> bool {
        let payload = match record.to_json() {
            Ok(p) => p,
            Err(e) => {
                error!("Publisher: serialization failed: {}", e);
                sink.emit(&AppEvent::EventDropped { attempts: 0 });
                return false;
            }
        };
        drop(record);

        let mut attempts = 0;
        while self.policy.allows(attempts) {
            attempts += 1;

            if !supervisor.refresh_session(broker, sink) {
                warn!(
                    "Publisher: no session, reconnecting (attempt {}/{})",
                    attempts, self.policy.max_attempts
                );
                supervisor.ensure_session(broker, time, clock, sink);
                continue;
            }

            match broker.publish(&self.topic, payload.as_bytes()) {
                Ok(()) => {
                    info!("Publisher: event sent on '{}' ({} attempt(s))", self.topic, attempts);
                    sink.emit(&AppEvent::EventPublished { attempts });
                    return true;
                }
                Err(e) => {
                    warn!(
                        "Publisher: attempt {}/{} failed: {}",
                        attempts, self.policy.max_attempts, e
                    );
                    if let Some(ms) = self.policy.backoff_after(attempts) {
                        time.delay_ms(ms);
                    }
                }
            }
        }

        error!("Publisher: event dropped after {} attempts: {}", attempts, payload);
        sink.emit(&AppEvent::EventDropped { attempts });
        false
    }
}
