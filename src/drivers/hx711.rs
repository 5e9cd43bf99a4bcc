//! HX711 24-bit load-cell ADC, bit-banged over two GPIOs.
//!
//! DOUT goes low when a conversion is ready.  The host then clocks 24 data
//! bits out MSB-first on PD_SCK, followed by 1–3 extra pulses that select
//! the gain/channel for the *next* conversion (1 pulse = channel A, ×128).
//!
//! Generic over `embedded-hal` 1.0 pin and delay traits.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;

/// Channel A, gain 128.
const GAIN_PULSES_A128: u8 = 1;
/// One conversion at 10 SPS takes ~100 ms.
const CONVERSION_TIMEOUT_MS: u32 = 200;

/// Sign-extend a 24-bit two's-complement value.
pub fn sign_extend_24(raw: u32) -> i32 {
    ((raw << 8) as i32) >> 8
}

pub struct Hx711<DT, SCK, D> {
    dout: DT,
    sck: SCK,
    delay: D,
    offset: i32,
    scale: f32,
}

impl<DT: InputPin, SCK: OutputPin, D: DelayNs> Hx711<DT, SCK, D> {
    pub fn new(dout: DT, mut sck: SCK, delay: D) -> Result<Self, SensorError> {
        // PD_SCK low takes the chip out of power-down.
        sck.set_low().map_err(|_| SensorError::Bus)?;
        Ok(Self {
            dout,
            sck,
            delay,
            offset: 0,
            scale: 1.0,
        })
    }

    pub fn is_ready(&mut self) -> bool {
        self.dout.is_low().unwrap_or(false)
    }

    /// Poll for readiness every millisecond, for at most `timeout_ms`.
    pub fn wait_ready(&mut self, timeout_ms: u32) -> bool {
        for _ in 0..=timeout_ms {
            if self.is_ready() {
                return true;
            }
            self.delay.delay_ms(1);
        }
        false
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Clock out one conversion.
    pub fn read_raw(&mut self) -> Result<i32, SensorError> {
        if !self.wait_ready(CONVERSION_TIMEOUT_MS) {
            return Err(SensorError::ScaleTimeout);
        }
        let mut value: u32 = 0;
        for _ in 0..24 {
            self.pulse()?;
            let bit = self.dout.is_high().map_err(|_| SensorError::Bus)?;
            value = (value << 1) | u32::from(bit);
        }
        for _ in 0..GAIN_PULSES_A128 {
            self.pulse()?;
        }
        Ok(sign_extend_24(value))
    }

    pub fn read_average(&mut self, times: u8) -> Result<i32, SensorError> {
        let times = times.max(1);
        let mut sum: i64 = 0;
        for _ in 0..times {
            sum += i64::from(self.read_raw()?);
        }
        Ok((sum / i64::from(times)) as i32)
    }

    /// Record the current average as the zero point.
    pub fn tare(&mut self, times: u8) -> Result<(), SensorError> {
        self.offset = self.read_average(times)?;
        Ok(())
    }

    /// Averaged reading minus tare, divided by the calibration factor.
    pub fn get_units(&mut self, times: u8) -> Result<f32, SensorError> {
        let avg = self.read_average(times)?;
        Ok((avg - self.offset) as f32 / self.scale)
    }

    fn pulse(&mut self) -> Result<(), SensorError> {
        self.sck.set_high().map_err(|_| SensorError::Bus)?;
        self.delay.delay_us(1);
        self.sck.set_low().map_err(|_| SensorError::Bus)?;
        self.delay.delay_us(1);
        Ok(())
    }
}
