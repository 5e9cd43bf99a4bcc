//! MQTT broker-session adapter.
//!
//! Implements [`BrokerPort`].  Each [`connect`](BrokerPort::connect)
//! builds a fresh client with the caller's client id, so a session that
//! half-closed on the broker never blocks the new one.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`;
//!   the connection flag is driven by the client's event callback.
//! - **all other targets**: in-memory simulation with scripted failures.

use log::{info, warn};

use crate::app::ports::BrokerPort;
use crate::config::SystemConfig;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    hal::delay::FreeRtos,
    mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS},
};

/// PubSubClient-style return code for a handshake that never completed.
const RC_CONNECTION_TIMEOUT: i32 = -4;

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const HANDSHAKE_POLL_MS: u32 = 50;

pub struct MqttAdapter {
    url: String,
    keepalive_secs: u16,
    timeout_secs: u16,
    /// Longest a single `connect()` waits for CONNACK.
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    handshake_timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    connected: Arc<AtomicBool>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

/// Host-side broker double.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimBroker {
    connected: bool,
    fail_connects: u32,
    fail_publishes: u32,
    client_ids: Vec<String>,
    published: Vec<(String, Vec<u8>)>,
}

impl MqttAdapter {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            url: config.broker_url(),
            keepalive_secs: config.broker_keepalive_secs,
            timeout_secs: config.broker_timeout_secs,
            handshake_timeout_ms: 5_000,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            connected: Arc::new(AtomicBool::new(false)),
            #[cfg(not(target_os = "espidf"))]
            sim: SimBroker::default(),
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        use core::time::Duration;

        self.platform_disconnect();

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            keep_alive_interval: Some(Duration::from_secs(u64::from(self.keepalive_secs))),
            network_timeout: Duration::from_secs(u64::from(self.timeout_secs)),
            ..Default::default()
        };

        let flag = self.connected.clone();
        let client = EspMqttClient::new_cb(&self.url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => flag.store(true, Ordering::SeqCst),
            EventPayload::Disconnected => flag.store(false, Ordering::SeqCst),
            _ => {}
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {:?}", e);
            CommsError::SessionRefused(e.code())
        })?;
        self.client = Some(client);

        let mut waited = 0;
        while waited < self.handshake_timeout_ms {
            if self.connected.load(Ordering::SeqCst) {
                return Ok(());
            }
            FreeRtos::delay_ms(HANDSHAKE_POLL_MS);
            waited += HANDSHAKE_POLL_MS;
        }
        self.platform_disconnect();
        Err(CommsError::SessionRefused(RC_CONNECTION_TIMEOUT))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        self.sim.client_ids.push(client_id.to_string());
        if self.sim.fail_connects > 0 {
            self.sim.fail_connects -= 1;
            return Err(CommsError::SessionRefused(RC_CONNECTION_TIMEOUT));
        }
        self.sim.connected = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        // Dropping the client stops its task and closes the socket.
        self.client = None;
        self.connected.store(false, Ordering::SeqCst);
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim.connected = false;
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: publish error {:?}", e);
                CommsError::PublishRejected
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if self.sim.fail_publishes > 0 {
            self.sim.fail_publishes -= 1;
            return Err(CommsError::PublishRejected);
        }
        self.sim.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::SeqCst)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim.connected
    }
}

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    /// Make the next `n` handshakes fail.
    pub fn sim_fail_connects(&mut self, n: u32) {
        self.sim.fail_connects = n;
    }

    /// Make the next `n` publishes fail.
    pub fn sim_fail_publishes(&mut self, n: u32) {
        self.sim.fail_publishes = n;
    }

    /// Simulate the broker closing the session.
    pub fn sim_drop(&mut self) {
        self.sim.connected = false;
    }

    pub fn sim_client_ids(&self) -> &[String] {
        &self.sim.client_ids
    }

    pub fn sim_published(&self) -> &[(String, Vec<u8>)] {
        &self.sim.published
    }
}

// ───────────────────────────────────────────────────────────────
// BrokerPort
// ───────────────────────────────────────────────────────────────

impl BrokerPort for MqttAdapter {
    fn connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        info!(
            "MQTT: connecting to {} as '{}' (keepalive {}s, timeout {}s)",
            self.url, client_id, self.keepalive_secs, self.timeout_secs
        );
        self.platform_connect(client_id)
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        info!("MQTT: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.platform_is_connected() {
            return Err(CommsError::NotConnected);
        }
        self.platform_publish(topic, payload)
    }

    fn poll(&mut self) {
        // The ESP-IDF client services its socket on its own task; the
        // simulation has nothing to pump.
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
