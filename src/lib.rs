//! WashStation controller library.
//!
//! Exposes the metering core, ports and adapters for integration testing
//! and for the firmware binary.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod pins;
pub mod session;

pub mod adapters;
pub mod drivers;

pub use app::service::{ControlFacade, ControlResult};
pub use error::{ControlError, Rejected};
pub use session::{SessionState, SessionStatus};
