//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the in-memory port doubles in `mock_hw`.  All tests run on the
//! host (x86_64) with no radio, reader or load cell required.

mod keepalive_tests;
mod mock_hw;
mod publisher_tests;
mod supervisor_tests;
