//! System configuration parameters
//!
//! All tunable parameters for the FarmSync checkpoint.
//! Values can be overridden via NVS (non-volatile storage); WiFi credentials
//! default to the `FARMSYNC_WIFI_SSID` / `FARMSYNC_WIFI_PASS` build-time
//! environment when set.

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Default scale calibration factor (raw counts per unit), used when NVS
/// has no `calFactor` entry.
pub const DEFAULT_CALIBRATION_FACTOR: f32 = 2280.0;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- WiFi ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,

    // --- Broker ---
    /// MQTT broker host name or IPv4 address
    pub broker_host: heapless::String<64>,
    pub broker_port: u16,
    /// MQTT protocol keepalive (seconds)
    pub broker_keepalive_secs: u16,
    /// Network/socket timeout for the session (seconds)
    pub broker_timeout_secs: u16,
    /// Topic for tap events
    pub event_topic: heapless::String<64>,
    /// Topic for liveness messages
    pub keepalive_topic: heapless::String<64>,

    // --- Identity ---
    /// Device name used in keepalives and as the MQTT client id prefix
    pub device_name: heapless::String<24>,
    pub truck_id: heapless::String<16>,
    pub estate_id: heapless::String<16>,

    // --- Timing ---
    /// Badge presence poll granularity (milliseconds)
    pub presence_poll_interval_ms: u32,
    /// PN532 passive-target detection timeout per poll (milliseconds)
    pub reader_timeout_ms: u32,
    /// Idle period after activity that forces a session cycle (milliseconds)
    pub activity_timeout_ms: u32,
    /// Keepalive message interval (milliseconds)
    pub keepalive_interval_ms: u32,
    /// Quiet period after a processed tap (anti double-tap, milliseconds)
    pub tap_cooldown_ms: u32,
    /// Quiet period after an unknown badge (milliseconds)
    pub unknown_badge_cooldown_ms: u32,
    /// Pause between session teardown and reconnect (milliseconds)
    pub teardown_settle_ms: u32,

    // --- Retry ---
    pub publish_attempts: u32,
    pub publish_backoff_ms: u32,
    /// Link status polls before the device restarts
    pub link_attempts: u32,
    pub link_poll_ms: u32,
    pub session_attempts: u32,
    pub session_backoff_ms: u32,

    // --- Scale ---
    /// Raw readings averaged per weight sample
    pub scale_samples: u8,
    /// Boot-time wait for the HX711 to become ready (milliseconds)
    pub scale_ready_timeout_ms: u32,

    // --- NTP ---
    pub ntp_sync_attempts: u32,
    pub ntp_poll_ms: u32,
}

fn hstr<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // WiFi
            wifi_ssid: hstr(option_env!("FARMSYNC_WIFI_SSID").unwrap_or("")),
            wifi_password: hstr(option_env!("FARMSYNC_WIFI_PASS").unwrap_or("")),

            // Broker
            broker_host: hstr("192.168.0.101"),
            broker_port: 1883,
            broker_keepalive_secs: 60,
            broker_timeout_secs: 30,
            event_topic: hstr("tbs/received"),
            keepalive_topic: hstr("tbslocal/keepalive"),

            // Identity
            device_name: hstr("ESP32Client"),
            truck_id: hstr("TRK-00001"),
            estate_id: hstr("EST-00001"),

            // Timing
            presence_poll_interval_ms: 100,
            reader_timeout_ms: 50,
            activity_timeout_ms: 10_000,
            keepalive_interval_ms: 15_000,
            tap_cooldown_ms: 3_000,
            unknown_badge_cooldown_ms: 1_500,
            teardown_settle_ms: 500,

            // Retry
            publish_attempts: 3,
            publish_backoff_ms: 500,
            link_attempts: 40,
            link_poll_ms: 500,
            session_attempts: 5,
            session_backoff_ms: 2_000,

            // Scale
            scale_samples: 10,
            scale_ready_timeout_ms: 20_000,

            // NTP
            ntp_sync_attempts: 20,
            ntp_poll_ms: 500,
        }
    }
}

impl SystemConfig {
    pub fn publish_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.publish_attempts, self.publish_backoff_ms)
    }

    pub fn link_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.link_attempts, self.link_poll_ms)
    }

    pub fn session_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.session_attempts, self.session_backoff_ms)
    }

    /// `mqtt://host:port`
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.broker_host, self.broker_port)
    }
}
