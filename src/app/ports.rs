//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlFacade (domain)
//! ```
//!
//! Driven adapters (relays, clock, event sinks, storage) implement these
//! traits.  The [`ControlFacade`](super::service::ControlFacade) consumes
//! them via generics, so the metering core never touches hardware directly.
//!
//! ## Safety notes
//!
//! - **ActuatorPort** writes must be idempotent: the ticker re-asserts the
//!   running channel every cycle.
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers must handle every variant explicitly.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::config::StationConfig;
use crate::error::{ActuatorError, ClockError};

// ───────────────────────────────────────────────────────────────
// Relay channel
// ───────────────────────────────────────────────────────────────

/// Index of a relay output on the station board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel(pub u8);

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: time source → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source used for billing.
///
/// Shared between the facade and the ticker thread, hence `&self`.
pub trait ClockPort {
    /// Seconds since an arbitrary fixed origin.  Never goes backwards.
    fn now_secs(&self) -> Result<f64, ClockError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command relays.
pub trait ActuatorPort {
    /// Drive `channel` energised (`true`) or released (`false`).
    /// `Ok` means the level was written.
    fn set(&mut self, channel: Channel, energized: bool) -> Result<(), ActuatorError>;

    /// Release every relay (safe state at boot and shutdown).
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Service catalog (read-only lookup)
// ───────────────────────────────────────────────────────────────

/// Maps a service id to the relay it drives and its list price.
pub trait ServiceCatalog {
    fn resolve_channel(&self, service_id: &str) -> Option<Channel>;

    fn price_per_minute(&self, service_id: &str) -> Option<f64>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// queue drained by the main loop, a display, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists station configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid values are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped, so a bad write can never map a service onto a
/// relay that does not exist or give one away for free.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`StationConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<StationConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &StationConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
