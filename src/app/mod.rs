//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the checkpoint's main cooperative loop: presence
//! polling, tap correlation, publishing, keepalive and idle-timeout
//! supervision.  All interaction with hardware and the network happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable with fakes and a virtual clock.

pub mod events;
pub mod ports;
pub mod service;
