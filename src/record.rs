//! Outbound payloads: tap events and keepalives.
//!
//! ```text
//! tbs/received        {"truckId","eventType","weight","estateId","millId","millAddress","timestamp"}
//! tbslocal/keepalive  {"type":"keepalive","device","timestamp"}
//! ```
//!
//! Timestamps are UTC, second resolution, with the millisecond field fixed
//! at `.000`.

use chrono::DateTime;
use log::debug;
use serde::Serialize;

use crate::badge::{BadgeId, MillRecord};
use crate::config::SystemConfig;
use crate::tap_state::TapState;
use crate::weight;

/// `YYYY-MM-DDTHH:MM:SS.000Z`
pub type Timestamp = heapless::String<24>;

const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00.000Z";

/// Format Unix seconds as ISO-8601 UTC with a fixed `.000` fraction.
/// Out-of-range inputs render as the epoch.
pub fn iso8601_utc(unix_secs: i64) -> Timestamp {
    let mut out = Timestamp::new();
    let formatted = DateTime::from_timestamp(unix_secs, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S.000Z").to_string());
    match formatted {
        Some(s) if out.push_str(&s).is_ok() => out,
        _ => {
            out.clear();
            let _ = out.push_str(EPOCH_TIMESTAMP);
            out
        }
    }
}

/// One accepted tap, ready for serialization.  Built once, handed to the
/// publisher by value, dropped after serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub truck_id: heapless::String<16>,
    pub event_type: TapState,
    pub weight: i32,
    pub estate_id: heapless::String<16>,
    pub mill_id: &'static str,
    pub mill_address: &'static str,
    pub timestamp: Timestamp,
}

impl EventRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Composes [`EventRecord`]s with the station's fixed truck/estate identity.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    truck_id: heapless::String<16>,
    estate_id: heapless::String<16>,
}

impl EventBuilder {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            truck_id: config.truck_id.clone(),
            estate_id: config.estate_id.clone(),
        }
    }

    /// Pure: no validation beyond what the caller already established
    /// (the badge is known).
    pub fn build(
        &self,
        badge: &BadgeId,
        mill: MillRecord,
        weight: f32,
        event_type: TapState,
        unix_secs: i64,
    ) -> EventRecord {
        debug!("EventBuilder: {} -> {} ({})", badge, mill.id, event_type);
        EventRecord {
            truck_id: self.truck_id.clone(),
            event_type,
            weight: weight::truncate(weight),
            estate_id: self.estate_id.clone(),
            mill_id: mill.id,
            mill_address: mill.address,
            timestamp: iso8601_utc(unix_secs),
        }
    }
}

/// Liveness message on the keepalive topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeepaliveMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub device: &'a str,
    pub timestamp: Timestamp,
}

impl<'a> KeepaliveMessage<'a> {
    pub fn new(device: &'a str, unix_secs: i64) -> Self {
        Self {
            kind: "keepalive",
            device,
            timestamp: iso8601_utc(unix_secs),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
