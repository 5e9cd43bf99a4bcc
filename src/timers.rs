//! Monotonic timekeeping for the cooperative loop.
//!
//! All waits are timestamp comparisons against `TimePort::uptime_ms()`;
//! nothing here sleeps.  Elapsed time uses saturating subtraction so a
//! timestamp taken "in the future" (after a fake clock rewind) reads as 0.

/// Last-activity, last-keepalive and last-presence-poll timestamps.
///
/// Written by the main loop (presence polls, badge reads) and by the
/// connectivity supervisor (session windows, idle timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityClock {
    last_activity_ms: u64,
    last_keepalive_ms: u64,
    last_presence_poll_ms: u64,
    /// A badge (known or unknown) was read since the last idle-timeout reset.
    activity_seen: bool,
}

impl ActivityClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_activity_ms: now_ms,
            last_keepalive_ms: now_ms,
            last_presence_poll_ms: now_ms,
            activity_seen: false,
        }
    }

    /// A badge was read.
    pub fn record_activity(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
        self.activity_seen = true;
    }

    /// A fresh session starts its own keepalive and idle windows.
    pub fn restart_session_windows(&mut self, now_ms: u64) {
        self.last_keepalive_ms = now_ms;
        self.last_activity_ms = now_ms;
    }

    pub fn activity_seen(&self) -> bool {
        self.activity_seen
    }

    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_activity_ms)
    }

    /// Whether the idle window of `timeout_ms` has run out.
    pub fn idle_expired(&self, now_ms: u64, timeout_ms: u32) -> bool {
        self.idle_ms(now_ms) >= u64::from(timeout_ms)
    }

    /// Start a new idle window and forget earlier activity.
    pub fn reset_idle_window(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
        self.activity_seen = false;
    }

    /// Returns `true` (and restarts the interval) once every `interval_ms`.
    pub fn take_keepalive_slot(&mut self, now_ms: u64, interval_ms: u32) -> bool {
        if now_ms.saturating_sub(self.last_keepalive_ms) >= u64::from(interval_ms) {
            self.last_keepalive_ms = now_ms;
            true
        } else {
            false
        }
    }

    /// Returns `true` (and restarts the interval) once every `interval_ms`.
    pub fn take_presence_slot(&mut self, now_ms: u64, interval_ms: u32) -> bool {
        if now_ms.saturating_sub(self.last_presence_poll_ms) >= u64::from(interval_ms) {
            self.last_presence_poll_ms = now_ms;
            true
        } else {
            false
        }
    }
}

/// Timer-armed quiet period: "cooldown active until T".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cooldown {
    until_ms: Option<u64>,
}

impl Cooldown {
    pub fn arm(&mut self, now_ms: u64, duration_ms: u32) {
        self.until_ms = Some(now_ms + u64::from(duration_ms));
    }

    /// Checks the deadline and disarms once it has passed.
    pub fn is_active(&mut self, now_ms: u64) -> bool {
        match self.until_ms {
            Some(until) if now_ms < until => true,
            Some(_) => {
                self.until_ms = None;
                false
            }
            None => false,
        }
    }
}
