//! FarmSync checkpoint firmware library.
//!
//! Exposes the pure-logic modules for integration testing and the
//! adapters/drivers for `main.rs`.  All ESP-IDF-specific code is guarded
//! by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod badge;
pub mod config;
pub mod error;
pub mod keepalive;
pub mod publisher;
pub mod record;
pub mod retry;
pub mod supervisor;
pub mod tap_state;
pub mod timers;
pub mod weight;

pub mod adapters;
pub mod drivers;
pub mod pins;
