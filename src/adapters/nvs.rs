//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the checkpoint.
//!
//! - Tap states and the scale calibration factor live in the `"tbs"`
//!   namespace; the postcard-encoded [`SystemConfig`] blob lives in
//!   `"farmsync"`.
//! - Every write is followed by `nvs_commit()` before returning, so a
//!   restart right after a tap observes the new state.
//! - Config validation: all fields are range-checked before persistence
//!   and again after loading; out-of-range blobs load as the defaults.

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::{DEFAULT_CALIBRATION_FACTOR, SystemConfig};
use crate::tap_state::TAP_NAMESPACE;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub const CONFIG_NAMESPACE: &str = "farmsync";
pub const CONFIG_KEY: &str = "syscfg";
const CALIBRATION_KEY: &str = "calFactor";

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 1024;

/// NVS names (namespaces and keys) are at most 15 bytes plus NUL.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn nvs_name(s: &str) -> [u8; 16] {
    let mut out = [0u8; 16];
    let bytes = s.as_bytes();
    let len = bytes.len().min(15);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
    /// Simulation: make every write fail (flash-full / wear-out scenarios).
    #[cfg(not(target_os = "espidf"))]
    fail_writes: bool,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == (ESP_ERR_NVS_NO_FREE_PAGES as i32) || ret == (ESP_ERR_NVS_NEW_VERSION_FOUND as i32) {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != (ESP_OK as i32) {
                    return Err(StorageError::IoError);
                }
                if unsafe { nvs_flash_init() } != (ESP_OK as i32) {
                    return Err(StorageError::IoError);
                }
            } else if ret != (ESP_OK as i32) {
                return Err(StorageError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
            #[cfg(not(target_os = "espidf"))]
            fail_writes: false,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = nvs_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != (ESP_OK as i32) {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Scale calibration factor (`calFactor`, little-endian f32 in the
    /// tap namespace).  Missing or malformed entries fall back to
    /// [`DEFAULT_CALIBRATION_FACTOR`].
    pub fn load_calibration(&self) -> f32 {
        let mut buf = [0u8; 4];
        match self.read(TAP_NAMESPACE, CALIBRATION_KEY, &mut buf) {
            Ok(4) => {
                let factor = f32::from_le_bytes(buf);
                if factor.is_finite() && factor != 0.0 {
                    return factor;
                }
                warn!("NvsAdapter: invalid calibration factor {}, using default", factor);
            }
            Ok(n) => warn!("NvsAdapter: calibration entry has {} bytes, using default", n),
            Err(StorageError::NotFound) => {}
            Err(e) => warn!("NvsAdapter: calibration read failed: {}", e),
        }
        DEFAULT_CALIBRATION_FACTOR
    }

    pub fn store_calibration(&mut self, factor: f32) -> Result<(), StorageError> {
        self.write(TAP_NAMESPACE, CALIBRATION_KEY, &factor.to_le_bytes())
    }

    /// First boot: write the effective config and calibration factor for
    /// whichever of the two has no entry yet.  Existing entries, even
    /// unreadable ones, are left alone.
    pub fn seed_defaults(&mut self, config: &SystemConfig, calibration: f32) {
        if !self.exists(CONFIG_NAMESPACE, CONFIG_KEY) {
            match self.save(config) {
                Ok(()) => info!("NvsAdapter: seeded config"),
                Err(e) => warn!("NvsAdapter: could not seed config: {}", e),
            }
        }
        if !self.exists(TAP_NAMESPACE, CALIBRATION_KEY) {
            match self.store_calibration(calibration) {
                Ok(()) => info!("NvsAdapter: seeded calibration factor {}", calibration),
                Err(e) => warn!("NvsAdapter: could not seed calibration: {}", e),
            }
        }
    }

    /// Decode a stored config blob.  A blob that decodes but fails range
    /// validation is replaced by the defaults.
    fn decode_config(bytes: &[u8]) -> Result<SystemConfig, ConfigError> {
        let cfg: SystemConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        match validate_config(&cfg) {
            Ok(()) => Ok(cfg),
            Err(e) => {
                warn!("NvsAdapter: stored config rejected ({}), using defaults", e);
                Ok(SystemConfig::default())
            }
        }
    }
}

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if cfg.broker_host.is_empty() {
        return Err(ConfigError::ValidationFailed("broker_host must not be empty"));
    }
    if cfg.broker_port == 0 {
        return Err(ConfigError::ValidationFailed("broker_port must be 1–65535"));
    }
    if cfg.event_topic.is_empty() || cfg.keepalive_topic.is_empty() {
        return Err(ConfigError::ValidationFailed("topics must not be empty"));
    }
    if cfg.event_topic == cfg.keepalive_topic {
        return Err(ConfigError::ValidationFailed(
            "event_topic and keepalive_topic must differ",
        ));
    }
    if cfg.device_name.is_empty() {
        return Err(ConfigError::ValidationFailed("device_name must not be empty"));
    }
    if !(10..=1000).contains(&cfg.presence_poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "presence_poll_interval_ms must be 10–1000",
        ));
    }
    if cfg.reader_timeout_ms >= cfg.presence_poll_interval_ms {
        return Err(ConfigError::ValidationFailed(
            "reader_timeout_ms must be < presence_poll_interval_ms",
        ));
    }
    if !(1_000..=600_000).contains(&cfg.activity_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "activity_timeout_ms must be 1000–600000",
        ));
    }
    if !(1_000..=600_000).contains(&cfg.keepalive_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "keepalive_interval_ms must be 1000–600000",
        ));
    }
    if !(1..=10).contains(&cfg.publish_attempts) {
        return Err(ConfigError::ValidationFailed("publish_attempts must be 1–10"));
    }
    if !(1..=20).contains(&cfg.session_attempts) {
        return Err(ConfigError::ValidationFailed("session_attempts must be 1–20"));
    }
    if !(1..=600).contains(&cfg.link_attempts) {
        return Err(ConfigError::ValidationFailed("link_attempts must be 1–600"));
    }
    if cfg.scale_samples == 0 {
        return Err(ConfigError::ValidationFailed("scale_samples must be ≥ 1"));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            if let Some(bytes) = self.store.borrow().get(&key) {
                let cfg = Self::decode_config(bytes)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let key = nvs_name(CONFIG_KEY);
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
                };
                if ret != (ESP_OK as i32) || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != (ESP_OK as i32) {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg = Self::decode_config(&bytes)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == (ESP_ERR_NVS_NOT_FOUND as i32) => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            self.store.borrow_mut().insert(key, bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let key = nvs_name(CONFIG_KEY);
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != (ESP_OK as i32) {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != (ESP_OK as i32) {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) if data.len() > buf.len() => Err(StorageError::TooLarge),
                Some(data) => {
                    buf[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let key = nvs_name(key);

                // Size first: nvs_get_blob refuses a short buffer outright.
                let mut size: usize = 0;
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
                };
                if ret != (ESP_OK as i32) {
                    return Err(ret);
                }
                if size > buf.len() {
                    return Ok(None);
                }

                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != (ESP_OK as i32) {
                    return Err(ret);
                }
                Ok(Some(size))
            });
            match result {
                Ok(Some(size)) => Ok(size),
                Ok(None) => Err(StorageError::TooLarge),
                // A namespace that was never written can't be opened read-only.
                Err(e) if e == (ESP_ERR_NVS_NOT_FOUND as i32) => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if self.fail_writes {
                warn!("NvsAdapter(sim): write to {}::{} failed", namespace, key);
                return Err(StorageError::IoError);
            }
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let key = nvs_name(key);
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                if ret != (ESP_OK as i32) {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != (ESP_OK as i32) {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                if e == (ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32) {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().remove(&composite);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let key = nvs_name(key);
                let ret = unsafe { nvs_erase_key(handle, key.as_ptr() as *const _) };
                if ret != (ESP_OK as i32) && ret != (ESP_ERR_NVS_NOT_FOUND as i32) {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != (ESP_OK as i32) {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow().contains_key(&composite)
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let key = nvs_name(key);
                let ret = unsafe {
                    nvs_find_key(handle, key.as_ptr() as *const _, core::ptr::null_mut())
                };
                Ok(ret == (ESP_OK as i32))
            });
            result.unwrap_or(false)
        }
    }
}
