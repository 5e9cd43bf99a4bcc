//! Device identity derived from the ESP32 factory MAC address.
//!
//! The MAC seeds the broker client-id generator so two checkpoints that
//! boot at the same instant still pick different client ids.

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Fold the MAC and a boot-time entropy sample into a non-zero seed.
pub fn client_seed(mac: &MacAddress, entropy: u32) -> u32 {
    let mut seed = entropy ^ 0x9E37_79B9;
    for &b in mac {
        seed = seed.rotate_left(5) ^ u32::from(b);
        seed = seed.wrapping_mul(0x0100_0193);
    }
    if seed == 0 { 1 } else { seed }
}

/// Hardware RNG sample (RF noise once the radio is up).
#[cfg(target_os = "espidf")]
pub fn boot_entropy() -> u32 {
    unsafe { esp_idf_svc::sys::esp_random() }
}

#[cfg(not(target_os = "espidf"))]
pub fn boot_entropy() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos())
}
