//! Station configuration parameters
//!
//! All tunable parameters for the wash station: starting wallet, billing
//! cadence and the service catalog.  Values can be overridden via NVS
//! (non-volatile storage).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::pins;
use crate::session::{ServiceId, service_id};

/// Maximum number of catalog entries (stack-allocated).
pub const MAX_SERVICES: usize = 8;

/// One metered service offered by the station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Identifier used by callers, e.g. `"water"`.
    pub id: ServiceId,
    /// Relay channel index (position in [`pins::RELAY_GPIOS`]).
    pub channel: u8,
    /// List price in currency units per minute of Running time.
    pub price_per_minute: f64,
}

impl ServiceEntry {
    /// Build an entry; `None` if `id` does not fit a [`ServiceId`].
    pub fn new(id: &str, channel: u8, price_per_minute: f64) -> Option<Self> {
        Some(Self {
            id: service_id(id)?,
            channel,
            price_per_minute,
        })
    }
}

/// Core station configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    // --- Wallet ---
    /// Balance loaded into the session at boot
    pub initial_balance: f64,
    /// ISO currency code shown next to balances
    pub currency: heapless::String<8>,

    // --- Timing ---
    /// Billing tick interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,

    // --- Catalog ---
    /// Services and the relay each one drives
    pub services: heapless::Vec<ServiceEntry, MAX_SERVICES>,
}

impl Default for StationConfig {
    fn default() -> Self {
        let mut currency = heapless::String::new();
        let _ = currency.push_str("UZS");

        // Two relays, each shared by a pair of services.
        let mut services = heapless::Vec::new();
        for (id, channel, price) in [
            ("water", 0, 1000.0),
            ("osmosis", 0, 1500.0),
            ("chemicals", 1, 2000.0),
            ("foam", 1, 2500.0),
        ] {
            if let Some(entry) = ServiceEntry::new(id, channel, price) {
                let _ = services.push(entry);
            }
        }

        Self {
            // Wallet
            initial_balance: 10_000.0,
            currency,

            // Timing
            tick_interval_ms: 1000,       // 1 Hz
            telemetry_interval_secs: 60,  // 1/min

            services,
        }
    }
}

impl StationConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "initial_balance must be a non-negative amount",
            ));
        }
        if !(10..=10_000).contains(&self.tick_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_ms must be 10–10000",
            ));
        }
        if !(1..=3600).contains(&self.telemetry_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_secs must be 1–3600",
            ));
        }
        if self.services.is_empty() {
            return Err(ConfigError::ValidationFailed("service catalog is empty"));
        }
        for (i, entry) in self.services.iter().enumerate() {
            if entry.id.is_empty() {
                return Err(ConfigError::ValidationFailed("service id must not be empty"));
            }
            if !entry.price_per_minute.is_finite() || entry.price_per_minute <= 0.0 {
                return Err(ConfigError::ValidationFailed(
                    "price_per_minute must be positive",
                ));
            }
            if usize::from(entry.channel) >= pins::RELAY_COUNT {
                return Err(ConfigError::ValidationFailed(
                    "service channel has no relay",
                ));
            }
            if self.services[..i].iter().any(|other| other.id == entry.id) {
                return Err(ConfigError::ValidationFailed("duplicate service id"));
            }
        }
        Ok(())
    }

    /// Billing tick interval as a `Duration`.
    pub fn tick_interval(&self) -> core::time::Duration {
        core::time::Duration::from_millis(u64::from(self.tick_interval_ms))
    }
}
