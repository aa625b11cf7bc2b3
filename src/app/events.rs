//! Outbound application events.
//!
//! The [`ControlFacade`](super::service::ControlFacade) and the billing
//! ticker emit these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them: log to
//! serial, queue them for the main loop, drive a customer display, etc.

use serde::Serialize;

use crate::error::RunFault;
use crate::session::{EndReason, ServiceId, SessionStatus};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// The session moved between lifecycle states.
    StateChanged { from: SessionStatus, to: SessionStatus },

    /// A run began on a relay.
    RunStarted {
        service: ServiceId,
        channel: u8,
        rate_per_minute: f64,
    },

    /// A run returned to Idle.
    RunEnded {
        service: ServiceId,
        billed_secs: f64,
        reason: EndReason,
    },

    /// Balance after a billing tick.
    BalanceUpdated { balance: f64, remaining_secs: f64 },

    /// Credit was added to the wallet.
    BalanceAdded { amount: f64, balance: f64 },

    /// A collaborator failure aborted the running service.
    FaultDetected(RunFault),

    /// The controller has started (carries the initial status).
    Started(SessionStatus),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryData {
    pub status: SessionStatus,
    pub service: Option<ServiceId>,
    pub balance: f64,
    pub remaining_secs: f64,
    pub uptime_secs: u64,
    pub fault: Option<RunFault>,
}
