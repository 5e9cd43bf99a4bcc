//! Retry policy objects.
//!
//! Every bounded retry loop in the firmware (link association, session
//! handshake, publish) is described by a [`RetryPolicy`] instead of inline
//! constants, so the loops can be exercised with a fake clock.

use serde::{Deserialize, Serialize};

/// At most `max_attempts` tries, with a fixed `backoff_ms` pause between
/// consecutive tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u32,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff_ms: u32) -> Self {
        Self { max_attempts, backoff_ms }
    }

    /// Whether another try is allowed after `attempts_used` tries.
    pub const fn allows(&self, attempts_used: u32) -> bool {
        attempts_used < self.max_attempts
    }

    /// Pause to take after a failed try, or `None` when it was the last
    /// one (no point waiting before giving up).
    pub const fn backoff_after(&self, attempts_used: u32) -> Option<u32> {
        if self.allows(attempts_used) { Some(self.backoff_ms) } else { None }
    }

    /// Worst-case time a caller can spend blocked inside this policy.
    pub const fn worst_case_blocking_ms(&self) -> u64 {
        self.max_attempts.saturating_sub(1) as u64 * self.backoff_ms as u64
    }
}
