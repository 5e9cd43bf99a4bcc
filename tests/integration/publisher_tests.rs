//! Publisher retry semantics against a scripted broker.

use farmsync::app::events::AppEvent;
use farmsync::badge::{BadgeId, MILL_2};
use farmsync::config::SystemConfig;
use farmsync::publisher::Publisher;
use farmsync::record::{EventBuilder, EventRecord};
use farmsync::supervisor::{ConnectivityState, ConnectivitySupervisor, LinkOutcome};
use farmsync::tap_state::TapState;
use farmsync::timers::ActivityClock;

use crate::mock_hw::{FakeTime, MILL_2_UID, MockBroker, MockLink, RecordingSink};

struct Bench {
    config: SystemConfig,
    supervisor: ConnectivitySupervisor,
    broker: MockBroker,
    time: FakeTime,
    clock: ActivityClock,
    sink: RecordingSink,
}

impl Bench {
    /// Supervisor with link and session up; clean delay and event logs.
    fn connected() -> Self {
        let config = SystemConfig::default();
        let mut b = Self {
            supervisor: ConnectivitySupervisor::new(&config, 99),
            broker: MockBroker::new(),
            time: FakeTime::new(),
            clock: ActivityClock::new(0),
            sink: RecordingSink::new(),
            config,
        };
        let mut link = MockLink::up();
        assert_eq!(
            b.supervisor.ensure_link(&mut link, &mut b.time, &mut b.sink),
            LinkOutcome::Up
        );
        assert!(b
            .supervisor
            .ensure_session(&mut b.broker, &mut b.time, &mut b.clock, &mut b.sink));
        b.time.delays.clear();
        b.sink.clear();
        b.broker.client_ids.clear();
        b
    }

    fn record(&self) -> EventRecord {
        EventBuilder::new(&self.config).build(
            &BadgeId::from_uid(&MILL_2_UID),
            MILL_2,
            880.0,
            TapState::Tap2,
            1_700_000_000,
        )
    }

    fn publish(&mut self) -> bool {
        let record = self.record();
        Publisher::new(&self.config).publish(
            record,
            &mut self.supervisor,
            &mut self.broker,
            &mut self.time,
            &mut self.clock,
            &mut self.sink,
        )
    }
}

#[test]
fn first_try_success() {
    let mut b = Bench::connected();
    assert!(b.publish());
    assert_eq!(b.broker.publish_calls, 1);
    assert!(b.time.delays.is_empty());
    assert!(b.sink.contains(&AppEvent::EventPublished { attempts: 1 }));

    let (topic, payload) = &b.broker.published[0];
    assert_eq!(topic, "tbs/received");
    let v: serde_json::Value = serde_json::from_str(payload).unwrap();
    assert_eq!(v["eventType"], "TAP-2");
    assert_eq!(v["millId"], "MILL-00002");
    assert_eq!(v["weight"], 880);
}

#[test]
fn two_failures_then_success() {
    let mut b = Bench::connected();
    b.broker.fail_publishes = 2;

    assert!(b.publish());
    assert_eq!(b.broker.publish_calls, 3);
    assert_eq!(b.broker.published.len(), 1);
    assert_eq!(b.time.delays, vec![500, 500]);
    assert!(b.sink.contains(&AppEvent::EventPublished { attempts: 3 }));
}

#[test]
fn three_failures_drop_the_event() {
    let mut b = Bench::connected();
    b.broker.fail_publishes = 3;

    assert!(!b.publish());
    assert_eq!(b.broker.publish_calls, 3, "exactly three attempts");
    assert!(b.broker.published.is_empty());
    // No backoff after the final attempt.
    assert_eq!(b.time.delays, vec![500, 500]);
    assert!(b.sink.contains(&AppEvent::EventDropped { attempts: 3 }));
}

#[test]
fn reconnect_consumes_an_attempt() {
    let mut b = Bench::connected();
    b.broker.drop_session();

    assert!(b.publish());
    assert!(b.sink.contains(&AppEvent::SessionLost));
    assert_eq!(b.broker.client_ids.len(), 1);
    assert_eq!(b.broker.publish_calls, 1);
    assert!(b.sink.contains(&AppEvent::EventPublished { attempts: 2 }));
    assert_eq!(b.supervisor.state(), ConnectivityState::SessionUp);
}

#[test]
fn failed_reconnect_then_recovery_uses_last_attempt() {
    let mut b = Bench::connected();
    b.broker.drop_session();
    // The whole first reconnect cycle (5 handshakes) fails.
    b.broker.fail_connects = 5;

    assert!(b.publish());
    assert!(b.sink.contains(&AppEvent::SessionFailed { attempts: 5 }));
    assert_eq!(b.broker.client_ids.len(), 6);
    assert_eq!(b.broker.publish_calls, 1);
    assert!(b.sink.contains(&AppEvent::EventPublished { attempts: 3 }));
}

#[test]
fn unreachable_broker_drops_without_publishing() {
    let mut b = Bench::connected();
    b.broker.drop_session();
    b.broker.fail_connects = u32::MAX;

    assert!(!b.publish());
    assert_eq!(b.broker.publish_calls, 0);
    assert_eq!(
        b.sink
            .count(|e| matches!(e, AppEvent::SessionFailed { .. })),
        3
    );
    assert!(b.sink.contains(&AppEvent::EventDropped { attempts: 3 }));
    assert_eq!(b.supervisor.state(), ConnectivityState::SessionDown);
}
