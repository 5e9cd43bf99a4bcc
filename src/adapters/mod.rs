//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements       | Connects to               |
//! |-------------|------------------|---------------------------|
//! | `hardware`  | BadgeReaderPort  | PN532 over I2C            |
//! |             | WeightPort       | HX711 over GPIO           |
//! | `log_sink`  | EventSink        | Serial log output         |
//! | `mqtt`      | BrokerPort       | ESP-IDF MQTT client       |
//! | `nvs`       | ConfigPort       | NVS / in-memory store     |
//! |             | StoragePort      |                           |
//! | `time`      | TimePort         | ESP32 timer, SNTP clock   |
//! | `wifi`      | LinkPort         | ESP-IDF WiFi STA          |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
