//! Unified error types for the FarmSync firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! boot sequence's error handling uniform.  All variants are `Copy` so they
//! can be passed through the supervisor and publisher without allocation.
//!
//! Transient failures (session drop, publish rejected, unknown badge) never
//! reach this type at runtime: each layer retries or skips locally and
//! reports a plain success/failure signal to its caller.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible boot-time operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be initialised or read.
    Sensor(SensorError),
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// HX711 never pulled DOUT low within the boot window.
    ScaleTimeout,
    /// PN532 did not answer the firmware-version query.
    ReaderNotFound,
    /// Bus-level failure talking to a sensor (I2C / GPIO).
    Bus,
    /// Reader answered with a malformed or unexpected frame.
    Protocol,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScaleTimeout => write!(f, "load cell not ready"),
            Self::ReaderNotFound => write!(f, "NFC reader not detected"),
            Self::Bus => write!(f, "sensor bus error"),
            Self::Protocol => write!(f, "sensor protocol error"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// No WiFi credentials configured.
    NoCredentials,
    /// SSID must be 1-32 printable ASCII bytes.
    InvalidSsid,
    /// Password must be empty (open) or 8-64 bytes (WPA2).
    InvalidPassword,
    /// Link association could not be started.
    LinkFailed,
    /// Broker refused or timed out the session handshake (carries the
    /// transport's return code when available).
    SessionRefused(i32),
    /// Operation needs an established session.
    NotConnected,
    /// Broker client rejected the outbound message.
    PublishRejected,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::LinkFailed => write!(f, "WiFi association failed"),
            Self::SessionRefused(rc) => write!(f, "MQTT session refused (rc={rc})"),
            Self::NotConnected => write!(f, "MQTT session not connected"),
            Self::PublishRejected => write!(f, "MQTT publish rejected"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
