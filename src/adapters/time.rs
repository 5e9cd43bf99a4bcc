//! ESP32 time adapter.
//!
//! Implements [`TimePort`] for the checkpoint.
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`,
//!   wall clock from `gettimeofday()` (set by SNTP), delays via FreeRTOS.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` / `SystemTime`
//!   and `thread::sleep` for host-side runs.

use log::{info, warn};

use crate::app::ports::TimePort;
use crate::retry::RetryPolicy;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{hal::delay::FreeRtos, sntp::EspSntp};

/// Wall-clock readings below this are treated as "never synced".
pub const WALL_CLOCK_SYNCED_AFTER: i64 = 100_000;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl TimePort for Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(target_os = "espidf")]
    fn unix_secs(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }

    #[cfg(not(target_os = "espidf"))]
    fn unix_secs(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

/// Start SNTP against the default pool.  The returned handle must stay
/// alive for the clock to keep being disciplined.
#[cfg(target_os = "espidf")]
pub fn start_sntp() -> Result<EspSntp<'static>, esp_idf_svc::sys::EspError> {
    let sntp = EspSntp::new_default()?;
    info!("SNTP: started");
    Ok(sntp)
}

/// Poll the wall clock until it looks synced, at most `policy.max_attempts`
/// times `policy.backoff_ms` apart.  A timeout is not fatal: events are
/// then stamped with whatever the RTC holds.
pub fn wait_for_wall_clock(time: &mut impl TimePort, policy: RetryPolicy) -> bool {
    let mut polls = 0;
    loop {
        let now = time.unix_secs();
        if now >= WALL_CLOCK_SYNCED_AFTER {
            info!("Time: wall clock synced ({} s since epoch)", now);
            return true;
        }
        if !policy.allows(polls) {
            warn!("Time: no SNTP sync after {} polls, continuing anyway", polls);
            return false;
        }
        time.delay_ms(policy.backoff_ms);
        polls += 1;
    }
}
