//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the device context, the connectivity supervisor
//! and the tap pipeline.  All I/O flows through port traits injected at
//! call sites, so the whole checkpoint is testable with mock adapters.
//!
//! ```text
//!  BadgeReaderPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!       WeightPort ──▶ │          AppService           │
//!      StoragePort ◀─▶ │ Supervisor · Taps · Publisher │ ◀─▶ BrokerPort
//!         TimePort ──▶ └──────────────────────────────┘ ◀─▶ LinkPort
//! ```
//!
//! One [`tick`](AppService::tick) is one cooperative main-loop pass:
//!
//! 1. supervise link and broker session
//! 2. keepalive, if due
//! 3. idle-timeout reconnect, if due
//! 4. skip the rest while a cooldown is armed
//! 5. poll the reader on the presence interval and handle a badge

use log::{error, info, warn};

use crate::badge::{BadgeDirectory, BadgeId, BadgeUid, StaticBadgeRegistry};
use crate::config::SystemConfig;
use crate::keepalive::KeepaliveEmitter;
use crate::publisher::Publisher;
use crate::record::EventBuilder;
use crate::supervisor::{ConnectivityState, ConnectivitySupervisor, LinkOutcome};
use crate::tap_state::{TapState, TapStateStore};
use crate::timers::{ActivityClock, Cooldown};

use super::events::AppEvent;
use super::ports::{
    BadgeReaderPort, BrokerPort, EventSink, LinkPort, StoragePort, TimePort, WeightPort,
};

/// Mutable per-device timing state shared by the loop components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceContext {
    pub clock: ActivityClock,
    pub cooldown: Cooldown,
}

impl DeviceContext {
    pub fn new(now_ms: u64) -> Self {
        Self {
            clock: ActivityClock::new(now_ms),
            cooldown: Cooldown::default(),
        }
    }
}

/// What a single main-loop pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do (no badge, or presence interval not elapsed).
    Idle,
    CoolingDown,
    BadgeRejected,
    /// Tap state could not be persisted; no event was built.
    TapStoreFailed,
    TapPublished(TapState),
    /// Tap persisted but the event was dropped after all attempts.
    TapDropped(TapState),
    /// Link reassociation exhausted; the caller must restart the device.
    RestartRequired,
}

/// The application service orchestrates all domain logic.
pub struct AppService<D: BadgeDirectory = StaticBadgeRegistry> {
    config: SystemConfig,
    directory: D,
    ctx: DeviceContext,
    supervisor: ConnectivitySupervisor,
    publisher: Publisher,
    keepalive: KeepaliveEmitter,
    tap_store: TapStateStore,
    builder: EventBuilder,
    taps_processed: u64,
}

impl AppService<StaticBadgeRegistry> {
    /// Service with the built-in badge registry.
    ///
    /// `client_seed` seeds broker client-id generation; use something
    /// device-unique (MAC bytes).
    pub fn new(config: SystemConfig, client_seed: u32) -> Self {
        Self::with_directory(config, StaticBadgeRegistry::default(), client_seed)
    }
}

impl<D: BadgeDirectory> AppService<D> {
    pub fn with_directory(config: SystemConfig, directory: D, client_seed: u32) -> Self {
        Self {
            supervisor: ConnectivitySupervisor::new(&config, client_seed),
            publisher: Publisher::new(&config),
            keepalive: KeepaliveEmitter::new(&config),
            tap_store: TapStateStore::default(),
            builder: EventBuilder::new(&config),
            ctx: DeviceContext::new(0),
            directory,
            config,
            taps_processed: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Reset the device context to `time`'s clock and announce the loop.
    pub fn start(&mut self, time: &impl TimePort, sink: &mut impl EventSink) {
        self.ctx = DeviceContext::new(time.uptime_ms());
        sink.emit(&AppEvent::Started);
        info!("AppService started");
    }

    /// Boot-time link bring-up (before SNTP and sensor init).
    pub fn connect_link(
        &mut self,
        link: &mut impl LinkPort,
        time: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> LinkOutcome {
        self.supervisor.ensure_link(link, time, sink)
    }

    /// Boot-time session bring-up.  A failed session is not fatal; the
    /// loop keeps retrying.
    pub fn connect_session(
        &mut self,
        broker: &mut impl BrokerPort,
        time: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> bool {
        let up = self
            .supervisor
            .ensure_session(broker, time, &mut self.ctx.clock, sink);
        if !up {
            warn!("AppService: no broker session at boot, will retry from the loop");
        }
        up
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one main-loop pass.
    ///
    /// `hw` satisfies both [`BadgeReaderPort`] and [`WeightPort`]; the
    /// reader and the scale live on one hardware adapter.
    pub fn tick(
        &mut self,
        hw: &mut (impl BadgeReaderPort + WeightPort),
        store: &mut impl StoragePort,
        link: &mut impl LinkPort,
        broker: &mut impl BrokerPort,
        time: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        // 1. Connectivity
        if self.supervisor.poll(link, broker, time, &mut self.ctx.clock, sink)
            == LinkOutcome::RestartRequired
        {
            return TickOutcome::RestartRequired;
        }

        // 2. Keepalive
        self.keepalive
            .tick(&self.supervisor, broker, time, &mut self.ctx.clock, sink);

        // 3. Idle timeout
        self.supervisor
            .enforce_activity_timeout(broker, time, &mut self.ctx.clock, sink);

        // 4. Cooldown
        let now = time.uptime_ms();
        if self.ctx.cooldown.is_active(now) {
            return TickOutcome::CoolingDown;
        }

        // 5. Presence poll
        if !self
            .ctx
            .clock
            .take_presence_slot(now, self.config.presence_poll_interval_ms)
        {
            return TickOutcome::Idle;
        }
        match hw.poll_badge() {
            Some(uid) => self.handle_badge(&uid, hw, store, broker, time, sink),
            None => TickOutcome::Idle,
        }
    }

    /// Lookup → weigh → toggle → build → publish → cooldown.
    fn handle_badge(
        &mut self,
        uid: &BadgeUid,
        scale: &mut impl WeightPort,
        store: &mut impl StoragePort,
        broker: &mut impl BrokerPort,
        time: &mut impl TimePort,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        let now = time.uptime_ms();
        self.ctx.clock.record_activity(now);

        let badge = BadgeId::from_uid(uid);
        info!("Badge detected: {}", badge);

        let Some(mill) = self.directory.lookup(&badge) else {
            warn!("Unknown badge {}, ignored", badge);
            sink.emit(&AppEvent::BadgeRejected { badge });
            self.ctx.cooldown.arm(now, self.config.unknown_badge_cooldown_ms);
            return TickOutcome::BadgeRejected;
        };

        let weight = scale.sample();

        let event_type = match self.tap_store.toggle(store, &badge) {
            Ok(t) => t,
            Err(e) => {
                error!("Tap state for {} not persisted ({}), tap rejected", badge, e);
                sink.emit(&AppEvent::TapStoreFailed { badge });
                self.ctx.cooldown.arm(now, self.config.unknown_badge_cooldown_ms);
                return TickOutcome::TapStoreFailed;
            }
        };

        let record = self
            .builder
            .build(&badge, mill, weight, event_type, time.unix_secs());
        info!(
            "Tap {} for {} at {} ({} units)",
            event_type, badge, mill.id, record.weight
        );
        sink.emit(&AppEvent::TapAccepted {
            badge,
            event_type,
            weight: record.weight,
        });

        let delivered = self.publisher.publish(
            record,
            &mut self.supervisor,
            broker,
            time,
            &mut self.ctx.clock,
            sink,
        );
        self.taps_processed += 1;
        self.ctx
            .cooldown
            .arm(time.uptime_ms(), self.config.tap_cooldown_ms);

        if delivered {
            TickOutcome::TapPublished(event_type)
        } else {
            TickOutcome::TapDropped(event_type)
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn connectivity(&self) -> ConnectivityState {
        self.supervisor.state()
    }

    /// Successful broker session establishments since construction.
    pub fn sessions_established(&self) -> u32 {
        self.supervisor.sessions_established()
    }

    /// Accepted taps (published or dropped) since startup.
    pub fn taps_processed(&self) -> u64 {
        self.taps_processed
    }

    pub fn context(&self) -> &DeviceContext {
        &self.ctx
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }
}
