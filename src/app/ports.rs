//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (badge reader, load cell, NVS, WiFi, MQTT, clock) implement
//! these traits.  The [`AppService`](super::service::AppService) consumes them
//! via generics at call sites, so the domain core never touches hardware and
//! every port can be replaced by an in-memory fake in tests.

use crate::badge::BadgeUid;
use crate::config::SystemConfig;
use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapters: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Presence detection for identity badges.
pub trait BadgeReaderPort {
    /// Look for a badge in the field.  Blocks at most for the reader's
    /// short detection timeout; `None` means nothing was presented or the
    /// read failed (failures are logged by the adapter, never propagated).
    fn poll_badge(&mut self) -> Option<BadgeUid>;
}

/// Stabilised load-cell reading.
pub trait WeightPort {
    /// Average several raw readings and return the weight.
    ///
    /// Values in the open interval (-10, 0) are reported as exactly 0.
    /// Returns 0 when the sensor is not ready.
    fn sample(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Network ports (driven adapters: domain ↔ link / broker)
// ───────────────────────────────────────────────────────────────

/// Link layer (WiFi station).
pub trait LinkPort {
    /// Start (or restart) association with the configured access point.
    /// Completion is observed through [`is_connected`](Self::is_connected).
    fn begin_connect(&mut self) -> Result<(), CommsError>;

    fn is_connected(&self) -> bool;
}

/// Application layer session with the message broker.
pub trait BrokerPort {
    /// Perform one session handshake using `client_id`.
    fn connect(&mut self, client_id: &str) -> Result<(), CommsError>;

    /// Tear the session down.  Idempotent.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Publish one message; `Ok` means the client accepted it.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError>;

    /// Service the session (inbound acks, protocol pings).
    fn poll(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic and wall-clock time, plus the one blocking primitive the
/// firmware uses: backoff pauses inside retry loops.
pub trait TimePort {
    /// Milliseconds since boot (monotonic).
    fn uptime_ms(&self) -> u64;

    /// Seconds since the Unix epoch (UTC).  Before SNTP sync this is
    /// whatever the RTC holds, usually close to 0.
    fn unix_secs(&self) -> i64;

    /// Block the single control flow for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage (tap states, calibration factor).
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - `write` MUST be durable when it returns: no batching, no deferred
///   commit.  A restart right after `Ok(())` must observe the new value.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    ///
    /// A stored value longer than `buf` is never truncated; the read fails
    /// with [`StorageError::TooLarge`] instead.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value and commit it.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Stored value does not fit the caller's buffer.
    TooLarge,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::TooLarge => write!(f, "value larger than buffer"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
