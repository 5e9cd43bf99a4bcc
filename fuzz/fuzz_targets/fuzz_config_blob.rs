//! Fuzz target: stored config blob decoding
//!
//! Plants arbitrary bytes where the postcard-encoded config lives and loads
//! it back.  A corrupt blob must surface as an error, never a panic, and
//! whatever loads has passed validation, so saving it back must succeed.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use farmsync::adapters::nvs::{CONFIG_KEY, CONFIG_NAMESPACE, NvsAdapter};
use farmsync::app::ports::{ConfigPort, StoragePort};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut nvs) = NvsAdapter::new() else {
        return;
    };
    if nvs.write(CONFIG_NAMESPACE, CONFIG_KEY, data).is_err() {
        return;
    }
    if let Ok(cfg) = nvs.load() {
        assert!(nvs.save(&cfg).is_ok());
    }
});
