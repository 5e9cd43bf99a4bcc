//! Badge identifiers and the badge → mill directory.
//!
//! A badge UID arrives from the reader as raw bytes and is canonicalised
//! once into an uppercase, space-separated hex string (`"53 DD 0E E2"`).
//! That string is the identity used everywhere else: directory lookup,
//! tap-state persistence, logging.

use core::fmt::{self, Write};

/// Longest ISO14443A UID (triple-size).
pub const MAX_UID_LEN: usize = 10;

/// Raw UID bytes as read from the reader.
pub type BadgeUid = heapless::Vec<u8, MAX_UID_LEN>;

/// Canonical badge identifier: `"XX XX XX XX"`.
///
/// Immutable once built; equality is exact string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BadgeId(heapless::String<{ MAX_UID_LEN * 3 }>);

impl BadgeId {
    /// Format raw UID bytes as two-digit uppercase hex, space-joined,
    /// with no trailing separator.
    pub fn from_uid(uid: &[u8]) -> Self {
        let mut s = heapless::String::new();
        for (i, byte) in uid.iter().take(MAX_UID_LEN).enumerate() {
            if i > 0 {
                let _ = s.push(' ');
            }
            let _ = write!(s, "{:02X}", byte);
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A destination mill.  Compiled-in, read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MillRecord {
    pub id: &'static str,
    pub address: &'static str,
}

pub const MILL_1: MillRecord = MillRecord {
    id: "MILL-00001",
    address: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
};

pub const MILL_2: MillRecord = MillRecord {
    id: "MILL-00002",
    address: "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC",
};

/// Badges issued to the two known mills.
pub const KNOWN_BADGES: &[(&str, MillRecord)] = &[("53 DD 0E E2", MILL_1), ("29 2C 03 04", MILL_2)];

/// Lookup from badge identity to its destination mill.
///
/// The checkpoint only ever asks "which mill is this badge bound for";
/// anything that cannot answer is an unknown badge.
pub trait BadgeDirectory {
    fn lookup(&self, badge: &BadgeId) -> Option<MillRecord>;
}

/// Fixed table of badges compiled into the firmware.
#[derive(Debug, Clone, Copy)]
pub struct StaticBadgeRegistry {
    entries: &'static [(&'static str, MillRecord)],
}

impl StaticBadgeRegistry {
    pub const fn new(entries: &'static [(&'static str, MillRecord)]) -> Self {
        Self { entries }
    }
}

impl Default for StaticBadgeRegistry {
    fn default() -> Self {
        Self::new(KNOWN_BADGES)
    }
}

impl BadgeDirectory for StaticBadgeRegistry {
    fn lookup(&self, badge: &BadgeId) -> Option<MillRecord> {
        self.entries
            .iter()
            .find(|(id, _)| *id == badge.as_str())
            .map(|(_, mill)| *mill)
    }
}
