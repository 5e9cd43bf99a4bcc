//! Keepalive emitter: interval gating and session suppression.

use farmsync::app::events::AppEvent;
use farmsync::config::SystemConfig;
use farmsync::keepalive::{KeepaliveEmitter, KeepaliveOutcome};
use farmsync::supervisor::ConnectivitySupervisor;
use farmsync::timers::ActivityClock;

use crate::mock_hw::{FakeTime, MockBroker, RecordingSink};

#[test]
fn suppressed_while_no_session() {
    let config = SystemConfig::default();
    let emitter = KeepaliveEmitter::new(&config);
    // Never connected: LinkDown.
    let sup = ConnectivitySupervisor::new(&config, 5);
    let mut broker = MockBroker::new();
    broker.connected = true;
    let mut time = FakeTime::new();
    let mut clock = ActivityClock::new(0);
    let mut sink = RecordingSink::new();

    time.set(15_000);
    assert_eq!(
        emitter.tick(&sup, &mut broker, &time, &mut clock, &mut sink),
        KeepaliveOutcome::Suppressed
    );
    assert_eq!(broker.publish_calls, 0);
    assert!(sink.events.is_empty());

    // The slot was consumed; nothing is queued for later.
    time.set(15_001);
    assert_eq!(
        emitter.tick(&sup, &mut broker, &time, &mut clock, &mut sink),
        KeepaliveOutcome::NotDue
    );
}

#[test]
fn publish_failure_is_not_retried() {
    let config = SystemConfig::default();
    let emitter = KeepaliveEmitter::new(&config);
    let mut sup = ConnectivitySupervisor::new(&config, 5);
    let mut broker = MockBroker::new();
    let mut time = FakeTime::new();
    let mut clock = ActivityClock::new(0);
    let mut sink = RecordingSink::new();
    assert!(sup.ensure_session(&mut broker, &mut time, &mut clock, &mut sink));

    broker.fail_publishes = 1;
    time.set(15_000);
    assert_eq!(
        emitter.tick(&sup, &mut broker, &time, &mut clock, &mut sink),
        KeepaliveOutcome::Failed
    );
    assert_eq!(broker.publish_calls, 1);
    assert!(sink.contains(&AppEvent::KeepaliveFailed));

    time.set(30_000);
    assert_eq!(
        emitter.tick(&sup, &mut broker, &time, &mut clock, &mut sink),
        KeepaliveOutcome::Sent
    );
    assert_eq!(broker.published_on("tbslocal/keepalive").len(), 1);
}
