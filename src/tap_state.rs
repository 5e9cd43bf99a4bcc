//! Persisted per-badge tap state.
//!
//! Each accepted tap flips the badge between `TAP-1` and `TAP-2`; a badge
//! never seen before starts at `TAP-1`.  The new state is committed to NVS
//! before [`TapStateStore::toggle`] returns, so a restart right after a tap
//! cannot replay it as the same event type.

use core::fmt::{self, Write};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::badge::BadgeId;

/// NVS namespace shared with the scale calibration factor.
pub const TAP_NAMESPACE: &str = "tbs";

/// ESP-IDF NVS keys are limited to 15 bytes.
const NVS_KEY_MAX: usize = 15;

/// Longest stored value (`"TAP-1"`).
const VALUE_MAX: usize = 8;

/// Event type derived from the badge's tap history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapState {
    #[serde(rename = "TAP-1")]
    Tap1,
    #[serde(rename = "TAP-2")]
    Tap2,
}

impl TapState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tap1 => "TAP-1",
            Self::Tap2 => "TAP-2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TAP-1" => Some(Self::Tap1),
            "TAP-2" => Some(Self::Tap2),
            _ => None,
        }
    }

    /// State produced by the next accepted tap.  Only an explicit `TAP-1`
    /// advances to `TAP-2`; no history (or `TAP-2`) yields `TAP-1`.
    pub const fn after(prev: Option<Self>) -> Self {
        match prev {
            Some(Self::Tap1) => Self::Tap2,
            Some(Self::Tap2) | None => Self::Tap1,
        }
    }
}

impl fmt::Display for TapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NVS key for a badge.
///
/// - Canonical string verbatim when it fits (every 4-byte UID does).
/// - Separator-free hex when that fits (6- and 7-byte UIDs).
/// - Otherwise 15 hex digits of an FNV-1a hash of the canonical string,
///   so 10-byte UIDs sharing a prefix still get distinct keys.
///
/// The three forms differ in length or in containing spaces, so they
/// never collide with each other.
pub fn storage_key(badge: &BadgeId) -> heapless::String<NVS_KEY_MAX> {
    let mut key = heapless::String::new();
    let canonical = badge.as_str();
    if canonical.len() <= NVS_KEY_MAX {
        let _ = key.push_str(canonical);
        return key;
    }
    let hex_len = canonical.chars().filter(|c| *c != ' ').count();
    if hex_len < NVS_KEY_MAX {
        for c in canonical.chars().filter(|c| *c != ' ') {
            let _ = key.push(c);
        }
        return key;
    }
    let _ = write!(key, "{:015X}", fnv1a(canonical.as_bytes()) & HASH_KEY_MASK);
    key
}

/// 60 bits: 15 hex digits.
const HASH_KEY_MASK: u64 = (1 << 60) - 1;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Badge → last emitted [`TapState`] mapping on top of a [`StoragePort`].
#[derive(Debug, Clone, Copy)]
pub struct TapStateStore {
    namespace: &'static str,
}

impl Default for TapStateStore {
    fn default() -> Self {
        Self::new(TAP_NAMESPACE)
    }
}

impl TapStateStore {
    pub const fn new(namespace: &'static str) -> Self {
        Self { namespace }
    }

    /// Last state persisted for `badge`, `None` if the badge was never seen.
    ///
    /// Values that don't parse are treated as no history.
    pub fn current(
        &self,
        storage: &impl StoragePort,
        badge: &BadgeId,
    ) -> Result<Option<TapState>, StorageError> {
        let key = storage_key(badge);
        let mut buf = [0u8; VALUE_MAX];
        match storage.read(self.namespace, &key, &mut buf) {
            Ok(len) => {
                let parsed = core::str::from_utf8(&buf[..len]).ok().and_then(TapState::parse);
                if parsed.is_none() {
                    warn!("TapStateStore: unreadable state for {}, treating as new", badge);
                }
                Ok(parsed)
            }
            Err(StorageError::NotFound) => Ok(None),
            Err(StorageError::TooLarge) => {
                warn!("TapStateStore: oversized state for {}, treating as new", badge);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Flip `badge` to its next state, persist it, and return it.
    pub fn toggle(
        &self,
        storage: &mut impl StoragePort,
        badge: &BadgeId,
    ) -> Result<TapState, StorageError> {
        let prev = self.current(storage, badge)?;
        let next = TapState::after(prev);
        storage.write(self.namespace, &storage_key(badge), next.as_str().as_bytes())?;
        info!("TapStateStore: {} {:?} -> {}", badge, prev, next);
        Ok(next)
    }
}
