//! FarmSync checkpoint firmware — main entry point.
//!
//! Hexagonal architecture, single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   Esp32Time       │
//! │  (Reader+Weight)   (EventSink)    (Config+NVS) (TimePort)      │
//! │  WifiAdapter       MqttAdapter                                 │
//! │  (LinkPort)        (BrokerPort)                                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Supervisor · TapStateStore · Publisher · Keepalive    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Boot: NVS → config → WiFi → SNTP → HX711 → PN532 → MQTT → loop.
//! A missing sensor halts the device; an unrecoverable link restarts it.
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Delay, FreeRtos};
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;
use log::{error, info, warn};

use farmsync::adapters::device_id;
use farmsync::adapters::hardware::HardwareAdapter;
use farmsync::adapters::log_sink::LogEventSink;
use farmsync::adapters::mqtt::MqttAdapter;
use farmsync::adapters::nvs::NvsAdapter;
use farmsync::adapters::time::{self, Esp32TimeAdapter};
use farmsync::adapters::wifi::WifiAdapter;
use farmsync::app::ports::ConfigPort;
use farmsync::app::service::{AppService, TickOutcome};
use farmsync::config::SystemConfig;
use farmsync::drivers::hx711::Hx711;
use farmsync::drivers::pn532::Pn532;
use farmsync::error::Error;
use farmsync::pins;
use farmsync::retry::RetryPolicy;
use farmsync::supervisor::LinkOutcome;

/// Idle yield between loop passes.
const LOOP_YIELD_MS: u32 = 10;

/// Park the device.  Used when a sensor is missing: there is nothing
/// useful to do until someone fixes the wiring and power-cycles.
fn halt(reason: &str) -> ! {
    error!("{} Halting.", reason);
    loop {
        FreeRtos::delay_ms(1_000);
    }
}

fn restart() -> ! {
    warn!("Restarting device");
    esp_idf_svc::hal::reset::restart();
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("=== FarmSync checkpoint v{} ===", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let mut sink = LogEventSink::new();
    let mut clock = Esp32TimeAdapter::new();

    // ── 2. NVS + config ───────────────────────────────────────
    let mut nvs = NvsAdapter::new().map_err(Error::from)?;
    let config = nvs.load().unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        SystemConfig::default()
    });
    let calibration = nvs.load_calibration();
    nvs.seed_defaults(&config, calibration);

    let seed = device_id::client_seed(&device_id::read_mac(), device_id::boot_entropy());
    let mut app = AppService::new(config.clone(), seed);

    // ── 3. Link ───────────────────────────────────────────────
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, None).map_err(Error::from)?;
    if let Err(e) = wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        halt(&format!("ERROR: WiFi credentials rejected: {}.", e));
    }
    if app.connect_link(&mut wifi, &mut clock, &mut sink) == LinkOutcome::RestartRequired {
        restart();
    }

    // ── 4. Wall clock ─────────────────────────────────────────
    let _sntp = time::start_sntp()?;
    time::wait_for_wall_clock(
        &mut clock,
        RetryPolicy::new(config.ntp_sync_attempts, config.ntp_poll_ms),
    );

    // ── 5. Sensors ────────────────────────────────────────────
    info!(
        "Pins: HX711 DOUT={} SCK={}, PN532 SDA={} SCL={} IRQ={} RST={}",
        pins::HX711_DOUT_GPIO,
        pins::HX711_SCK_GPIO,
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        pins::PN532_IRQ_GPIO,
        pins::PN532_RESET_GPIO,
    );
    let scale = Hx711::new(
        PinDriver::input(peripherals.pins.gpio32)?,
        PinDriver::output(peripherals.pins.gpio18)?,
        Delay::new_default(),
    )
    .map_err(Error::from)?;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUD_HZ)),
    )?;
    let mut reader = Pn532::new(i2c, Delay::new_default());
    let mut reset = PinDriver::output(peripherals.pins.gpio5)?;
    if let Err(e) = reader.hard_reset(&mut reset) {
        warn!("PN532 reset line: {}", e);
    }

    let mut delay = Delay::new_default();
    let mut hw = match HardwareAdapter::init(reader, scale, &config, calibration, &mut delay) {
        Ok(hw) => hw,
        Err(e) => halt(&format!("ERROR: {}.", e)),
    };

    // ── 6. Broker session ─────────────────────────────────────
    let mut mqtt = MqttAdapter::new(&config);
    app.connect_session(&mut mqtt, &mut clock, &mut sink);

    // ── 7. Main loop ──────────────────────────────────────────
    app.start(&clock, &mut sink);
    info!("System ready");

    loop {
        let outcome = app.tick(
            &mut hw,
            &mut nvs,
            &mut wifi,
            &mut mqtt,
            &mut clock,
            &mut sink,
        );
        if outcome == TickOutcome::RestartRequired {
            restart();
        }
        FreeRtos::delay_ms(LOOP_YIELD_MS);
    }
}
