//! Hardware adapter: bridges the reader and load cell to domain ports.
//!
//! Owns the [`Pn532`] and [`Hx711`] drivers and exposes them through
//! [`BadgeReaderPort`] and [`WeightPort`].  This is the only module that
//! talks to the sensors; read failures are logged here and turned into
//! "no badge" / zero weight, never propagated to the loop.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::app::ports::{BadgeReaderPort, WeightPort};
use crate::badge::BadgeUid;
use crate::config::SystemConfig;
use crate::drivers::hx711::Hx711;
use crate::drivers::pn532::Pn532;
use crate::error::{Result, SensorError};
use crate::weight;

/// Pause between the HX711 reporting ready and taking the tare reading.
const SCALE_SETTLE_MS: u32 = 2_000;
const SCALE_READY_POLL_MS: u32 = 1_000;

/// Concrete adapter that combines both sensors behind port traits.
pub struct HardwareAdapter<I2C, RD, DT, SCK, SD> {
    reader: Pn532<I2C, RD>,
    scale: Hx711<DT, SCK, SD>,
    reader_timeout_ms: u32,
    samples: u8,
}

impl<I2C, RD, DT, SCK, SD> HardwareAdapter<I2C, RD, DT, SCK, SD>
where
    I2C: I2c,
    RD: DelayNs,
    DT: InputPin,
    SCK: OutputPin,
    SD: DelayNs,
{
    /// Boot-time bring-up, scale first, then reader.
    ///
    /// - Scale: wait up to `scale_ready_timeout_ms` for the first
    ///   conversion, settle, apply `calibration`, tare.
    /// - Reader: firmware version query, then SAM configuration.
    ///
    /// Either sensor missing is fatal for the caller.
    pub fn init(
        mut reader: Pn532<I2C, RD>,
        mut scale: Hx711<DT, SCK, SD>,
        config: &SystemConfig,
        calibration: f32,
        delay: &mut impl DelayNs,
    ) -> Result<Self> {
        info!("Initializing HX711...");
        let mut waited = 0;
        while !scale.is_ready() {
            if waited >= config.scale_ready_timeout_ms {
                warn!("HX711 not ready after {} ms", waited);
                return Err(SensorError::ScaleTimeout.into());
            }
            delay.delay_ms(SCALE_READY_POLL_MS);
            waited += SCALE_READY_POLL_MS;
        }
        delay.delay_ms(SCALE_SETTLE_MS);
        scale.set_scale(calibration);
        scale.tare(config.scale_samples)?;
        info!(
            "HX711 ready (cal factor {}, offset {})",
            calibration,
            scale.offset()
        );

        info!("Initializing PN532...");
        let fw = reader.firmware_version()?;
        info!(
            "Found PN5{:02X}, firmware {}.{}",
            fw.ic, fw.version, fw.revision
        );
        reader.sam_config()?;
        info!("PN532 ready");

        Ok(Self {
            reader,
            scale,
            reader_timeout_ms: config.reader_timeout_ms,
            samples: config.scale_samples,
        })
    }
}

// ── BadgeReaderPort implementation ────────────────────────────

impl<I2C: I2c, RD: DelayNs, DT, SCK, SD> BadgeReaderPort for HardwareAdapter<I2C, RD, DT, SCK, SD> {
    fn poll_badge(&mut self) -> Option<BadgeUid> {
        match self.reader.read_passive_target(self.reader_timeout_ms) {
            Ok(uid) => uid,
            Err(e) => {
                debug!("PN532: poll failed: {}", e);
                None
            }
        }
    }
}

// ── WeightPort implementation ─────────────────────────────────

impl<I2C, RD, DT, SCK, SD> WeightPort for HardwareAdapter<I2C, RD, DT, SCK, SD>
where
    DT: InputPin,
    SCK: OutputPin,
    SD: DelayNs,
{
    fn sample(&mut self) -> f32 {
        if !self.scale.is_ready() {
            warn!("HX711 not ready, returning 0");
            return 0.0;
        }
        match self.scale.get_units(self.samples) {
            Ok(w) => weight::suppress_negative_noise(w),
            Err(e) => {
                warn!("HX711 read failed ({}), returning 0", e);
                0.0
            }
        }
    }
}
