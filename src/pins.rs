//! GPIO / peripheral pin assignments for the checkpoint board (ESP32 DevKit).
//!
//! Single source of truth; `main.rs` maps these to `esp-idf-hal` pins.

// ---------------------------------------------------------------------------
// Load cell (HX711)
// ---------------------------------------------------------------------------

/// Digital input: HX711 DOUT (low = conversion ready).
pub const HX711_DOUT_GPIO: i32 = 32;
/// Digital output: HX711 PD_SCK.
pub const HX711_SCK_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// NFC reader (PN532, I2C mode)
// ---------------------------------------------------------------------------

/// PN532 IRQ line (active low when a response is ready).
pub const PN532_IRQ_GPIO: i32 = 4;
/// PN532 RSTPDN line.
pub const PN532_RESET_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// I²C bus
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// Standard mode; the PN532 tops out at 400 kHz.
pub const I2C_BAUD_HZ: u32 = 100_000;
