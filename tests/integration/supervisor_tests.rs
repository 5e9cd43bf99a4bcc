//! Connectivity supervisor: link reassociation, session handshakes and
//! forced reconnects.

use farmsync::app::events::AppEvent;
use farmsync::config::SystemConfig;
use farmsync::supervisor::{ConnectivityState, ConnectivitySupervisor, LinkOutcome};
use farmsync::timers::ActivityClock;

use crate::mock_hw::{FakeTime, MockBroker, MockLink, RecordingSink};

fn supervisor() -> ConnectivitySupervisor {
    ConnectivitySupervisor::new(&SystemConfig::default(), 1234)
}

// ── Link ──────────────────────────────────────────────────────

#[test]
fn associated_link_needs_no_polling() {
    let mut sup = supervisor();
    let mut link = MockLink::up();
    let mut time = FakeTime::new();
    let mut sink = RecordingSink::new();

    assert_eq!(sup.ensure_link(&mut link, &mut time, &mut sink), LinkOutcome::Up);
    assert_eq!(sup.state(), ConnectivityState::SessionDown);
    assert_eq!(link.begin_calls, 0);
    assert!(time.delays.is_empty());
    assert_eq!(sink.events, vec![AppEvent::LinkUp]);
}

#[test]
fn link_comes_up_on_first_poll() {
    let mut sup = supervisor();
    let mut link = MockLink::up();
    link.connected = false;
    let mut time = FakeTime::new();
    let mut sink = RecordingSink::new();

    assert_eq!(sup.ensure_link(&mut link, &mut time, &mut sink), LinkOutcome::Up);
    assert_eq!(link.begin_calls, 1);
    assert_eq!(time.delays, vec![500]);
    // Never up before, so nothing was lost.
    assert!(!sink.contains(&AppEvent::LinkLost));
}

#[test]
fn dead_link_polls_forty_times_then_gives_up() {
    let mut sup = supervisor();
    let mut link = MockLink::dead();
    let mut time = FakeTime::new();
    let mut sink = RecordingSink::new();

    assert_eq!(
        sup.ensure_link(&mut link, &mut time, &mut sink),
        LinkOutcome::RestartRequired
    );
    assert_eq!(time.delays.len(), 40);
    assert_eq!(time.now_ms, 20_000);
    assert_eq!(sup.state(), ConnectivityState::LinkDown);
    assert!(sink.contains(&AppEvent::LinkExhausted { attempts: 40 }));
}

// ── Session ───────────────────────────────────────────────────

#[test]
fn handshake_uses_fresh_client_id_each_attempt() {
    let mut sup = supervisor();
    let mut broker = MockBroker::new();
    broker.fail_connects = 2;
    let mut time = FakeTime::new();
    let mut clock = ActivityClock::new(0);
    let mut sink = RecordingSink::new();

    assert!(sup.ensure_session(&mut broker, &mut time, &mut clock, &mut sink));
    assert_eq!(broker.client_ids.len(), 3);
    for id in &broker.client_ids {
        assert!(id.starts_with("ESP32Client-"), "bad client id {id}");
    }
    assert_ne!(broker.client_ids[0], broker.client_ids[1]);
    assert_ne!(broker.client_ids[1], broker.client_ids[2]);
    assert_eq!(time.delays, vec![2_000, 2_000]);
    assert_eq!(sup.sessions_established(), 1);

    let last = broker.client_ids.last().unwrap().clone();
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SessionUp { client_id } if client_id.as_str() == last
    )));
}

#[test]
fn session_up_restarts_keepalive_and_idle_windows() {
    let mut sup = supervisor();
    let mut broker = MockBroker::new();
    let mut time = FakeTime::new();
    time.set(40_000);
    let mut clock = ActivityClock::new(0);
    let mut sink = RecordingSink::new();

    assert!(sup.ensure_session(&mut broker, &mut time, &mut clock, &mut sink));
    assert!(!clock.take_keepalive_slot(54_999, 15_000));
    assert!(!clock.idle_expired(49_999, 10_000));
}

#[test]
fn refresh_detects_transport_drop_once() {
    let mut sup = supervisor();
    let mut broker = MockBroker::new();
    let mut time = FakeTime::new();
    let mut clock = ActivityClock::new(0);
    let mut sink = RecordingSink::new();
    sup.ensure_session(&mut broker, &mut time, &mut clock, &mut sink);
    assert!(sup.refresh_session(&broker, &mut sink));

    broker.drop_session();
    assert!(!sup.refresh_session(&broker, &mut sink));
    assert!(!sup.refresh_session(&broker, &mut sink));
    assert_eq!(sink.count(|e| *e == AppEvent::SessionLost), 1);
    assert_eq!(sup.state(), ConnectivityState::SessionDown);
}

#[test]
fn force_reconnect_tears_down_and_settles() {
    let mut sup = supervisor();
    let mut broker = MockBroker::new();
    let mut time = FakeTime::new();
    let mut clock = ActivityClock::new(0);
    let mut sink = RecordingSink::new();
    sup.ensure_session(&mut broker, &mut time, &mut clock, &mut sink);

    assert!(sup.force_reconnect(&mut broker, &mut time, &mut clock, &mut sink));
    assert_eq!(broker.disconnects, 1);
    assert_eq!(time.delays, vec![500]);
    assert_eq!(broker.client_ids.len(), 2);
    assert_eq!(sup.sessions_established(), 2);
}

#[test]
fn poll_services_live_session() {
    let mut sup = supervisor();
    let mut link = MockLink::up();
    let mut broker = MockBroker::new();
    let mut time = FakeTime::new();
    let mut clock = ActivityClock::new(0);
    let mut sink = RecordingSink::new();

    // First pass establishes, second services.
    sup.poll(&mut link, &mut broker, &mut time, &mut clock, &mut sink);
    assert_eq!(broker.polls, 0);
    sup.poll(&mut link, &mut broker, &mut time, &mut clock, &mut sink);
    assert_eq!(broker.polls, 1);
    assert_eq!(broker.client_ids.len(), 1);
}

// ── Idle timeout ──────────────────────────────────────────────

#[test]
fn idle_timeout_requires_activity() {
    let mut sup = supervisor();
    let mut broker = MockBroker::new();
    let mut time = FakeTime::new();
    let mut clock = ActivityClock::new(0);
    let mut sink = RecordingSink::new();
    sup.ensure_session(&mut broker, &mut time, &mut clock, &mut sink);

    time.set(10_000);
    assert!(!sup.enforce_activity_timeout(&mut broker, &mut time, &mut clock, &mut sink));
    assert_eq!(broker.disconnects, 0);

    clock.record_activity(12_000);
    time.set(21_999);
    assert!(!sup.enforce_activity_timeout(&mut broker, &mut time, &mut clock, &mut sink));
    time.set(22_000);
    assert!(sup.enforce_activity_timeout(&mut broker, &mut time, &mut clock, &mut sink));
    assert_eq!(broker.disconnects, 1);
    assert!(sink.contains(&AppEvent::IdleReconnect { idle_ms: 10_000 }));
    assert!(!clock.activity_seen());
}
