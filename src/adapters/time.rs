//! Monotonic clock adapter.
//!
//! Implements [`ClockPort`] for billing.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

use crate::app::ports::ClockPort;
use crate::error::ClockError;

/// Boot-relative monotonic clock.
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> Result<u64, ClockError> {
        // SAFETY: esp_timer is started by the IDF before app_main.
        let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        u64::try_from(us).map_err(|_| ClockError::Unavailable)
    }

    /// Microseconds since construction (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> Result<u64, ClockError> {
        u64::try_from(self.start.elapsed().as_micros()).map_err(|_| ClockError::Unavailable)
    }
}

impl ClockPort for MonotonicClock {
    fn now_secs(&self) -> Result<f64, ClockError> {
        Ok(self.uptime_us()? as f64 / 1_000_000.0)
    }
}
