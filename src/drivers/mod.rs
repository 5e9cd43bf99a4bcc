//! Peripheral drivers for the checkpoint's sensors.
//!
//! Both drivers are generic over `embedded-hal` 1.0 traits; `main.rs`
//! instantiates them with `esp-idf-hal` types, tests with scripted doubles.

pub mod hx711;
pub mod pn532;
