//! Fuzz target: badge identifier canonicalisation and tap-state keys
//!
//! Any UID the reader hands over must produce a well-formed identifier and
//! an NVS key within the 15-byte limit.
//!
//! cargo fuzz run fuzz_badge_uid

#![no_main]

use farmsync::badge::BadgeId;
use farmsync::tap_state::{TapState, storage_key};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let id = BadgeId::from_uid(data);
    assert!(!id.as_str().ends_with(' '));

    let key = storage_key(&id);
    assert!(key.len() <= 15);

    // Stored values are untrusted flash contents.
    if let Ok(s) = core::str::from_utf8(data) {
        if let Some(state) = TapState::parse(s) {
            assert_eq!(state.as_str(), s);
        }
    }
});
