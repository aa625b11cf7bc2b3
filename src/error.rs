//! Unified error types for the wash station controller.
//!
//! Guard violations (`AlreadyActive`, `InvalidTransition`, ...) are expected
//! outcomes returned to the caller and never leave the session half-changed.
//! Collaborator failures (`ActuatorFault`, `ClockFault`) carry the typed
//! cause from the port that failed.  All variants are `Copy` so they can be
//! stored in the session snapshot and passed across the ticker thread
//! without allocation.

use core::fmt;

use serde::Serialize;

use crate::session::SessionStatus;

// ---------------------------------------------------------------------------
// Control errors (returned by the facade)
// ---------------------------------------------------------------------------

/// Every rejected control operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// `start` while a run is already Running or Paused.
    AlreadyActive,
    /// `pause`/`resume` called in a state that does not satisfy the guard.
    InvalidTransition {
        op: &'static str,
        from: SessionStatus,
    },
    /// Non-positive or non-finite rate supplied to `start`.
    InvalidRate,
    /// The service id has no channel in the catalog.
    UnknownService,
    /// `start` with nothing left on the balance.
    InsufficientBalance,
    /// Non-positive or non-finite top-up amount.
    InvalidAmount,
    /// The actuator failed to confirm a commanded level.
    ActuatorFault(ActuatorError),
    /// The monotonic clock could not be read.
    ClockFault(ClockError),
    /// The billing ticker thread could not be spawned.
    SupervisorUnavailable,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "a service run is already active"),
            Self::InvalidTransition { op, from } => {
                write!(f, "cannot {op} while {}", from.name())
            }
            Self::InvalidRate => write!(f, "rate must be a positive amount per minute"),
            Self::UnknownService => write!(f, "unknown service"),
            Self::InsufficientBalance => write!(f, "balance is empty"),
            Self::InvalidAmount => write!(f, "top-up amount must be positive"),
            Self::ActuatorFault(e) => write!(f, "actuator: {e}"),
            Self::ClockFault(e) => write!(f, "clock: {e}"),
            Self::SupervisorUnavailable => write!(f, "billing ticker could not be started"),
        }
    }
}

impl std::error::Error for ControlError {}

impl From<ActuatorError> for ControlError {
    fn from(e: ActuatorError) -> Self {
        Self::ActuatorFault(e)
    }
}

impl From<ClockError> for ControlError {
    fn from(e: ClockError) -> Self {
        Self::ClockFault(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActuatorError {
    /// GPIO level write failed on the relay behind `channel`.
    GpioWriteFailed { channel: u8 },
    /// No relay is wired to this channel index.
    UnknownChannel(u8),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed { channel } => {
                write!(f, "GPIO write failed on relay {channel}")
            }
            Self::UnknownChannel(ch) => write!(f, "no relay on channel {ch}"),
        }
    }
}

impl std::error::Error for ActuatorError {}

// ---------------------------------------------------------------------------
// Clock errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClockError {
    /// The time source did not answer.
    Unavailable,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "time source unavailable"),
        }
    }
}

impl std::error::Error for ClockError {}

// ---------------------------------------------------------------------------
// Run faults
// ---------------------------------------------------------------------------

/// A collaborator failure that ended a run from the ticker.  Kept on the
/// session until the next successful `start` so `state()` can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunFault {
    Actuator(ActuatorError),
    Clock(ClockError),
}

impl fmt::Display for RunFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Clock(e) => write!(f, "clock: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, ControlError>;

// ---------------------------------------------------------------------------
// Rejection (facade boundary)
// ---------------------------------------------------------------------------

/// A refused control operation together with the unchanged session state.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub error: ControlError,
    pub state: crate::session::SessionState,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.error, self.state.status.name())
    }
}

impl std::error::Error for Rejected {}
