//! PN532 NFC reader over I2C.
//!
//! Host-controller framing (UM0701-02 §6.2):
//!
//! ```text
//! host → PN532   00 00 FF LEN LCS D4 CMD params.. DCS 00
//! PN532 → host   RDY | 00 00 FF 00 FF 00                   (ACK)
//! PN532 → host   RDY | 00 00 FF LEN LCS D5 CMD+1 data.. DCS 00
//! ```
//!
//! Every I2C read starts with a status byte; bit 0 set means the reader
//! has a frame ready.  Only the three commands the checkpoint needs are
//! implemented: firmware version query, SAM configuration, and a single ISO14443A
//! passive-target poll.
//!
//! Generic over `embedded-hal` 1.0 [`I2c`] and [`DelayNs`], so the same
//! driver runs on `esp-idf-hal`'s `I2cDriver` and on scripted test doubles.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

use crate::badge::{BadgeUid, MAX_UID_LEN};
use crate::error::SensorError;

pub const I2C_ADDRESS: u8 = 0x24;

const HOST_TO_PN532: u8 = 0xD4;
pub(crate) const PN532_TO_HOST: u8 = 0xD5;

pub(crate) const CMD_GET_FIRMWARE_VERSION: u8 = 0x02;
pub(crate) const CMD_SAM_CONFIGURATION: u8 = 0x14;
pub(crate) const CMD_IN_LIST_PASSIVE_TARGET: u8 = 0x4A;

/// 106 kbps ISO/IEC14443 Type A.
const BRTY_ISO14443A: u8 = 0x00;

pub(crate) const ACK: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];
pub(crate) const STATUS_READY: u8 = 0x01;

/// Largest frame we ever send: preamble(3) + LEN + LCS + TFI + CMD + 3 params + DCS + postamble.
const TX_MAX: usize = 16;
/// Status byte plus the largest response we parse.
const RX_MAX: usize = 40;

const ACK_TIMEOUT_MS: u32 = 10;
const COMMAND_TIMEOUT_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// Always 0x32 for a PN532.
    pub ic: u8,
    pub version: u8,
    pub revision: u8,
    pub support: u8,
}

/// Build a host → PN532 information frame into `out`; returns its length.
pub fn build_frame(cmd: u8, params: &[u8], out: &mut [u8; TX_MAX]) -> usize {
    let len = (2 + params.len()) as u8;
    out[0] = 0x00;
    out[1] = 0x00;
    out[2] = 0xFF;
    out[3] = len;
    out[4] = len.wrapping_neg();
    out[5] = HOST_TO_PN532;
    out[6] = cmd;
    let mut sum = HOST_TO_PN532.wrapping_add(cmd);
    for (i, p) in params.iter().enumerate() {
        out[7 + i] = *p;
        sum = sum.wrapping_add(*p);
    }
    let end = 7 + params.len();
    out[end] = sum.wrapping_neg();
    out[end + 1] = 0x00;
    end + 2
}

/// Validate a PN532 → host frame (status byte already stripped) and
/// return the data following the response code.
pub fn parse_response(frame: &[u8], cmd: u8) -> Result<&[u8], SensorError> {
    if frame.len() < 7 || frame[..3] != [0x00, 0x00, 0xFF] {
        return Err(SensorError::Protocol);
    }
    let len = frame[3];
    if len.wrapping_add(frame[4]) != 0 || len < 2 {
        return Err(SensorError::Protocol);
    }
    let body_end = 5 + len as usize;
    if frame.len() < body_end + 1 {
        return Err(SensorError::Protocol);
    }
    let body = &frame[5..body_end];
    if body[0] != PN532_TO_HOST || body[1] != cmd.wrapping_add(1) {
        return Err(SensorError::Protocol);
    }
    let sum = body.iter().fold(frame[body_end], |acc, b| acc.wrapping_add(*b));
    if sum != 0 {
        return Err(SensorError::Protocol);
    }
    Ok(&body[2..])
}

/// Extract the first target's UID from an InListPassiveTarget response.
pub fn parse_passive_target(data: &[u8]) -> Result<Option<BadgeUid>, SensorError> {
    match data.first() {
        None | Some(0) => return Ok(None),
        Some(_) => {}
    }
    // NbTg, Tg, SENS_RES(2), SEL_RES, NFCIDLength, NFCID1..
    let uid_len = *data.get(5).ok_or(SensorError::Protocol)? as usize;
    if uid_len == 0 || uid_len > MAX_UID_LEN {
        return Err(SensorError::Protocol);
    }
    let uid = data.get(6..6 + uid_len).ok_or(SensorError::Protocol)?;
    BadgeUid::from_slice(uid).map(Some).map_err(|_| SensorError::Protocol)
}

pub struct Pn532<I2C, D> {
    i2c: I2C,
    delay: D,
    rx: [u8; RX_MAX],
}

impl<I2C: I2c, D: DelayNs> Pn532<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            rx: [0; RX_MAX],
        }
    }

    /// Pulse the RSTPDN line.
    pub fn hard_reset<P: OutputPin>(&mut self, reset: &mut P) -> Result<(), SensorError> {
        reset.set_high().map_err(|_| SensorError::Bus)?;
        reset.set_low().map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(400);
        reset.set_high().map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    /// Firmware version query; a reader that doesn't answer is not on the bus.
    pub fn firmware_version(&mut self) -> Result<FirmwareVersion, SensorError> {
        let data = self
            .command(CMD_GET_FIRMWARE_VERSION, &[], COMMAND_TIMEOUT_MS)
            .map_err(|_| SensorError::ReaderNotFound)?
            .ok_or(SensorError::ReaderNotFound)?;
        match *data {
            [ic, version, revision, support, ..] => Ok(FirmwareVersion {
                ic,
                version,
                revision,
                support,
            }),
            _ => Err(SensorError::Protocol),
        }
    }

    /// Normal mode, no virtual-card timeout, IRQ line enabled.
    pub fn sam_config(&mut self) -> Result<(), SensorError> {
        self.command(CMD_SAM_CONFIGURATION, &[0x01, 0x14, 0x01], COMMAND_TIMEOUT_MS)?
            .ok_or(SensorError::Protocol)?;
        Ok(())
    }

    /// Look for one ISO14443A target for at most `timeout_ms`.
    pub fn read_passive_target(&mut self, timeout_ms: u32) -> Result<Option<BadgeUid>, SensorError> {
        match self.command(CMD_IN_LIST_PASSIVE_TARGET, &[0x01, BRTY_ISO14443A], timeout_ms)? {
            Some(data) => parse_passive_target(data),
            None => Ok(None),
        }
    }

    /// Send a command, wait for ACK, then up to `timeout_ms` for the
    /// response.  `Ok(None)` means the response did not arrive in time.
    fn command(
        &mut self,
        cmd: u8,
        params: &[u8],
        timeout_ms: u32,
    ) -> Result<Option<&[u8]>, SensorError> {
        let mut tx = [0u8; TX_MAX];
        let n = build_frame(cmd, params, &mut tx);
        self.i2c
            .write(I2C_ADDRESS, &tx[..n])
            .map_err(|_| SensorError::Bus)?;

        if !self.wait_ready(ACK_TIMEOUT_MS)? {
            debug!("PN532: no ACK for command 0x{:02X}", cmd);
            return Err(SensorError::Bus);
        }
        let mut ack = [0u8; 1 + ACK.len()];
        self.i2c
            .read(I2C_ADDRESS, &mut ack)
            .map_err(|_| SensorError::Bus)?;
        if ack[1..] != ACK {
            warn!("PN532: bad ACK {:02X?}", &ack[1..]);
            return Err(SensorError::Protocol);
        }

        if !self.wait_ready(timeout_ms)? {
            return Ok(None);
        }
        self.i2c
            .read(I2C_ADDRESS, &mut self.rx)
            .map_err(|_| SensorError::Bus)?;
        parse_response(&self.rx[1..], cmd).map(Some)
    }

    fn wait_ready(&mut self, timeout_ms: u32) -> Result<bool, SensorError> {
        let mut status = [0u8; 1];
        for _ in 0..=timeout_ms {
            self.i2c
                .read(I2C_ADDRESS, &mut status)
                .map_err(|_| SensorError::Bus)?;
            if status[0] & STATUS_READY != 0 {
                return Ok(true);
            }
            self.delay.delay_ms(1);
        }
        Ok(false)
    }
}
