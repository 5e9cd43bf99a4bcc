//! Connectivity supervisor: link and broker-session state machine.
//!
//! ```text
//!            association ok                handshake ok
//!  LinkDown ───────────────▶ SessionDown ───────────────▶ SessionUp
//!     ▲                          ▲  ◀──────────────────────    │
//!     │                          │   transport drop /          │
//!     └──────────────────────────┴── idle-timeout teardown ◀───┘
//!              link lost
//! ```
//!
//! - Link reassociation polls up to `link_attempts` times, `link_poll_ms`
//!   apart; exhausting them yields [`LinkOutcome::RestartRequired`].
//! - A session handshake is tried up to `session_attempts` times,
//!   `session_backoff_ms` apart; on exhaustion it is abandoned until the
//!   next main-loop iteration.
//! - Every transition into `SessionUp` restarts the keepalive and idle
//!   windows of the [`ActivityClock`].
//!
//! The supervisor is the only writer of [`ConnectivityState`].

use core::fmt::Write;

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{BrokerPort, EventSink, LinkPort, TimePort};
use crate::config::SystemConfig;
use crate::retry::RetryPolicy;
use crate::timers::ActivityClock;

/// `<device>-<hex>`; device names are at most 24 bytes.
pub type ClientId = heapless::String<40>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    LinkDown,
    /// Link associated, no broker session.
    SessionDown,
    SessionUp,
}

/// Result of link supervision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Up,
    /// Reassociation exhausted; local state is unrecoverable.
    RestartRequired,
}

/// Fresh pseudo-random client-id suffixes (xorshift32), so a reconnecting
/// device never collides with its own half-closed session on the broker.
#[derive(Debug, Clone)]
struct ClientIdGenerator {
    state: u32,
}

impl ClientIdGenerator {
    fn new(seed: u32) -> Self {
        Self { state: if seed == 0 { 0x9E37_79B9 } else { seed } }
    }

    fn next(&mut self, prefix: &str) -> ClientId {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        let mut id = ClientId::new();
        let _ = write!(id, "{}-{:x}", prefix, x & 0xFFFF);
        id
    }
}

pub struct ConnectivitySupervisor {
    state: ConnectivityState,
    link_policy: RetryPolicy,
    session_policy: RetryPolicy,
    activity_timeout_ms: u32,
    teardown_settle_ms: u32,
    device_name: heapless::String<24>,
    client_ids: ClientIdGenerator,
    /// Successful transitions into `SessionUp`.
    sessions_established: u32,
}

impl ConnectivitySupervisor {
    pub fn new(config: &SystemConfig, client_seed: u32) -> Self {
        Self {
            state: ConnectivityState::LinkDown,
            link_policy: config.link_policy(),
            session_policy: config.session_policy(),
            activity_timeout_ms: config.activity_timeout_ms,
            teardown_settle_ms: config.teardown_settle_ms,
            device_name: config.device_name.clone(),
            client_ids: ClientIdGenerator::new(client_seed),
            sessions_established: 0,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn sessions_established(&self) -> u32 {
        self.sessions_established
    }

    // ── Link layer ────────────────────────────────────────────

    /// Make sure the link is associated, blocking through the bounded
    /// reassociation loop if it isn't.
    pub fn ensure_link(
        &mut self,
        link: &mut impl LinkPort,
        time: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> LinkOutcome {
        if link.is_connected() {
            if self.state == ConnectivityState::LinkDown {
                self.state = ConnectivityState::SessionDown;
                sink.emit(&AppEvent::LinkUp);
            }
            return LinkOutcome::Up;
        }

        if self.state != ConnectivityState::LinkDown {
            warn!("Supervisor: link lost, reassociating");
            self.state = ConnectivityState::LinkDown;
            sink.emit(&AppEvent::LinkLost);
        }

        if let Err(e) = link.begin_connect() {
            warn!("Supervisor: association start failed: {}", e);
        }

        let mut polls = 0;
        while self.link_policy.allows(polls) {
            time.delay_ms(self.link_policy.backoff_ms);
            polls += 1;
            if link.is_connected() {
                info!("Supervisor: link up after {} polls", polls);
                self.state = ConnectivityState::SessionDown;
                sink.emit(&AppEvent::LinkUp);
                return LinkOutcome::Up;
            }
        }

        error!("Supervisor: link not up after {} polls, restart required", polls);
        sink.emit(&AppEvent::LinkExhausted { attempts: polls });
        LinkOutcome::RestartRequired
    }

    // ── Session layer ─────────────────────────────────────────

    /// Sync with the transport: a session the broker client reports as
    /// gone moves `SessionUp → SessionDown`.  Returns whether a session
    /// is usable right now.
    pub fn refresh_session(&mut self, broker: &impl BrokerPort, sink: &mut impl EventSink) -> bool {
        let connected = broker.is_connected();
        if !connected && self.state == ConnectivityState::SessionUp {
            warn!("Supervisor: broker session dropped");
            self.state = ConnectivityState::SessionDown;
            sink.emit(&AppEvent::SessionLost);
        }
        connected && self.state == ConnectivityState::SessionUp
    }

    /// Establish a broker session if there isn't one.  Returns `true`
    /// when a session is up on return.
    pub fn ensure_session(
        &mut self,
        broker: &mut impl BrokerPort,
        time: &mut impl TimePort,
        clock: &mut ActivityClock,
        sink: &mut impl EventSink,
    ) -> bool {
        if broker.is_connected() {
            if self.state != ConnectivityState::SessionUp {
                self.enter_session_up(None, time, clock, sink);
            }
            return true;
        }
        self.refresh_session(broker, sink);

        let mut attempts = 0;
        while self.session_policy.allows(attempts) {
            attempts += 1;
            let client_id = self.client_ids.next(&self.device_name);
            match broker.connect(&client_id) {
                Ok(()) => {
                    self.enter_session_up(Some(client_id), time, clock, sink);
                    return true;
                }
                Err(e) => {
                    warn!(
                        "Supervisor: session attempt {}/{} failed: {}",
                        attempts, self.session_policy.max_attempts, e
                    );
                    if let Some(ms) = self.session_policy.backoff_after(attempts) {
                        time.delay_ms(ms);
                    }
                }
            }
        }

        error!("Supervisor: broker session failed after {} attempts", attempts);
        sink.emit(&AppEvent::SessionFailed { attempts });
        false
    }

    fn enter_session_up(
        &mut self,
        client_id: Option<ClientId>,
        time: &impl TimePort,
        clock: &mut ActivityClock,
        sink: &mut impl EventSink,
    ) {
        self.state = ConnectivityState::SessionUp;
        self.sessions_established += 1;
        clock.restart_session_windows(time.uptime_ms());
        let client_id = client_id.unwrap_or_default();
        info!("Supervisor: broker session up (client_id='{}')", client_id);
        sink.emit(&AppEvent::SessionUp { client_id });
    }

    /// Tear the session down, let the socket settle, and reconnect.
    pub fn force_reconnect(
        &mut self,
        broker: &mut impl BrokerPort,
        time: &mut impl TimePort,
        clock: &mut ActivityClock,
        sink: &mut impl EventSink,
    ) -> bool {
        broker.disconnect();
        if self.state == ConnectivityState::SessionUp {
            self.state = ConnectivityState::SessionDown;
        }
        time.delay_ms(self.teardown_settle_ms);
        self.ensure_session(broker, time, clock, sink)
    }

    // ── Per-iteration supervision ─────────────────────────────

    /// One main-loop pass: link first, then session (reconnect if down,
    /// service it if up).
    pub fn poll(
        &mut self,
        link: &mut impl LinkPort,
        broker: &mut impl BrokerPort,
        time: &mut impl TimePort,
        clock: &mut ActivityClock,
        sink: &mut impl EventSink,
    ) -> LinkOutcome {
        if self.ensure_link(link, time, sink) == LinkOutcome::RestartRequired {
            return LinkOutcome::RestartRequired;
        }
        if self.refresh_session(broker, sink) {
            broker.poll();
        } else {
            self.ensure_session(broker, time, clock, sink);
        }
        LinkOutcome::Up
    }

    /// Idle-timeout monitor.  When the idle window expires after at least
    /// one badge read, cycle the session once.  The window is restarted
    /// either way; silence with no prior activity is not an anomaly.
    ///
    /// Returns `true` when a reconnect cycle was forced.
    pub fn enforce_activity_timeout(
        &mut self,
        broker: &mut impl BrokerPort,
        time: &mut impl TimePort,
        clock: &mut ActivityClock,
        sink: &mut impl EventSink,
    ) -> bool {
        let now = time.uptime_ms();
        if !clock.idle_expired(now, self.activity_timeout_ms) {
            return false;
        }

        let fire = clock.activity_seen();
        if fire {
            let idle_ms = clock.idle_ms(now);
            info!("Supervisor: no badge activity for {} ms, cycling session", idle_ms);
            sink.emit(&AppEvent::IdleReconnect { idle_ms });
            self.force_reconnect(broker, time, clock, sink);
        }
        clock.reset_idle_window(time.uptime_ms());
        fire
    }
}
