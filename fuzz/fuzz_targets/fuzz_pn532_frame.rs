//! Fuzz target: PN532 response parsing
//!
//! Feeds arbitrary bytes, as if read back from the reader after the status
//! byte, through frame validation and passive-target extraction.  Neither
//! may panic, and any UID produced must fit a badge identifier.
//!
//! cargo fuzz run fuzz_pn532_frame

#![no_main]

use farmsync::badge::MAX_UID_LEN;
use farmsync::drivers::pn532::{parse_passive_target, parse_response};
use libfuzzer_sys::fuzz_target;

/// InListPassiveTarget.
const CMD_LIST_PASSIVE: u8 = 0x4A;

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = parse_response(data, CMD_LIST_PASSIVE) {
        assert!(body.len() + 7 <= data.len());
        if let Ok(Some(uid)) = parse_passive_target(body) {
            assert!(!uid.is_empty() && uid.len() <= MAX_UID_LEN);
        }
    }

    // The target parser on its own must tolerate any input too.
    let _ = parse_passive_target(data);
});
