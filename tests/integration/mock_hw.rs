//! In-memory port doubles for integration tests.
//!
//! Every double records what the core asked of it so tests can assert on
//! the full call history without a radio, a reader or a flash chip.

use std::collections::{HashMap, VecDeque};

use farmsync::app::events::AppEvent;
use farmsync::app::ports::{
    BadgeReaderPort, BrokerPort, EventSink, LinkPort, StorageError, StoragePort, TimePort,
    WeightPort,
};
use farmsync::badge::BadgeUid;
use farmsync::error::CommsError;

/// Badge bound for MILL-00001.
pub const MILL_1_UID: [u8; 4] = [0x53, 0xDD, 0x0E, 0xE2];
/// Badge bound for MILL-00002.
pub const MILL_2_UID: [u8; 4] = [0x29, 0x2C, 0x03, 0x04];
/// Badge nobody issued.
pub const STRANGER_UID: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

/// Wall clock at uptime 0: 2023-11-14T22:13:20Z.
pub const BASE_UNIX_SECS: i64 = 1_700_000_000;

pub fn uid(bytes: &[u8]) -> BadgeUid {
    BadgeUid::from_slice(bytes).unwrap()
}

// ── MockHardware ──────────────────────────────────────────────

/// Reader + scale double.  Badges are consumed one per poll.
pub struct MockHardware {
    pub presented: VecDeque<BadgeUid>,
    pub weight: f32,
    pub polls: u32,
    pub samples: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            presented: VecDeque::new(),
            weight: 0.0,
            polls: 0,
            samples: 0,
        }
    }

    pub fn present(&mut self, bytes: &[u8]) {
        self.presented.push_back(uid(bytes));
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl BadgeReaderPort for MockHardware {
    fn poll_badge(&mut self) -> Option<BadgeUid> {
        self.polls += 1;
        self.presented.pop_front()
    }
}

impl WeightPort for MockHardware {
    fn sample(&mut self) -> f32 {
        self.samples += 1;
        self.weight
    }
}

// ── MemStore ──────────────────────────────────────────────────

/// HashMap-backed storage with an injectable write failure.
#[derive(Default)]
pub struct MemStore {
    map: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
    pub writes: u32,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_str(&self, ns: &str, key: &str) -> Option<String> {
        self.map
            .get(&format!("{ns}::{key}"))
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl StoragePort for MemStore {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let v = self
            .map
            .get(&format!("{ns}::{key}"))
            .ok_or(StorageError::NotFound)?;
        let dst = buf.get_mut(..v.len()).ok_or(StorageError::TooLarge)?;
        dst.copy_from_slice(v);
        Ok(v.len())
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.writes += 1;
        self.map.insert(format!("{ns}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
        self.map.remove(&format!("{ns}::{key}"));
        Ok(())
    }

    fn exists(&self, ns: &str, key: &str) -> bool {
        self.map.contains_key(&format!("{ns}::{key}"))
    }
}

// ── MockLink ──────────────────────────────────────────────────

/// WiFi double.  With `associate_on_begin` the link comes up as soon as
/// association is started; otherwise it stays down until a test flips it.
pub struct MockLink {
    pub connected: bool,
    pub associate_on_begin: bool,
    pub begin_calls: u32,
}

#[allow(dead_code)]
impl MockLink {
    pub fn up() -> Self {
        Self {
            connected: true,
            associate_on_begin: true,
            begin_calls: 0,
        }
    }

    /// Link that never associates.
    pub fn dead() -> Self {
        Self {
            connected: false,
            associate_on_begin: false,
            begin_calls: 0,
        }
    }
}

impl LinkPort for MockLink {
    fn begin_connect(&mut self) -> Result<(), CommsError> {
        self.begin_calls += 1;
        if self.associate_on_begin {
            self.connected = true;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ── MockBroker ────────────────────────────────────────────────

/// Broker double with scripted handshake and publish failures.
#[derive(Default)]
pub struct MockBroker {
    pub connected: bool,
    /// The next N handshakes are refused.
    pub fail_connects: u32,
    /// The next N publishes are rejected.
    pub fail_publishes: u32,
    pub client_ids: Vec<String>,
    pub published: Vec<(String, String)>,
    pub publish_calls: u32,
    pub disconnects: u32,
    pub polls: u32,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport-level drop, as if the broker closed the socket.
    pub fn drop_session(&mut self) {
        self.connected = false;
    }

    pub fn published_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}

impl BrokerPort for MockBroker {
    fn connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        self.client_ids.push(client_id.to_string());
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            return Err(CommsError::SessionRefused(5));
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        self.publish_calls += 1;
        if !self.connected {
            return Err(CommsError::NotConnected);
        }
        if self.fail_publishes > 0 {
            self.fail_publishes -= 1;
            return Err(CommsError::PublishRejected);
        }
        self.published.push((
            topic.to_string(),
            String::from_utf8_lossy(payload).into_owned(),
        ));
        Ok(())
    }

    fn poll(&mut self) {
        self.polls += 1;
    }
}

// ── FakeTime ──────────────────────────────────────────────────

/// Virtual clock.  `delay_ms` advances time instead of sleeping and is
/// recorded so tests can assert on backoff schedules.
#[derive(Default)]
pub struct FakeTime {
    pub now_ms: u64,
    pub delays: Vec<u32>,
}

#[allow(dead_code)]
impl FakeTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    pub fn set(&mut self, ms: u64) {
        self.now_ms = ms;
    }
}

impl TimePort for FakeTime {
    fn uptime_ms(&self) -> u64 {
        self.now_ms
    }

    fn unix_secs(&self) -> i64 {
        BASE_UNIX_SECS + (self.now_ms / 1_000) as i64
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
        self.now_ms += u64::from(ms);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.iter().any(|e| e == event)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
