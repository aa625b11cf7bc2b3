//! Session data types shared by the state machine, the facade and the
//! event stream.

use serde::Serialize;

use crate::app::ports::Channel;
use crate::error::RunFault;

/// Capacity of a service identifier (bytes).
pub const SERVICE_ID_CAP: usize = 24;

/// Service identifier, e.g. `"water"`.
pub type ServiceId = heapless::String<SERVICE_ID_CAP>;

/// Build a [`ServiceId`]; `None` if `raw` exceeds [`SERVICE_ID_CAP`].
pub fn service_id(raw: &str) -> Option<ServiceId> {
    let mut id = ServiceId::new();
    id.push_str(raw).ok()?;
    Some(id)
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Coarse lifecycle status of the metering session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SessionStatus {
    Idle = 0,
    Running = 1,
    Paused = 2,
}

impl SessionStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Paused => "Paused",
        }
    }
}

// ---------------------------------------------------------------------------
// Active run
// ---------------------------------------------------------------------------

/// The service, rate and relay of the current run.  Present only while the
/// session is Running or Paused, so the three are always set and cleared
/// together.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRun {
    pub service_id: ServiceId,
    pub rate_per_minute: f64,
    pub channel: Channel,
}

impl ActiveRun {
    /// Balance units consumed per second of Running time.
    pub fn rate_per_second(&self) -> f64 {
        self.rate_per_minute / 60.0
    }
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Why a run returned to Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// Explicit `stop()`.
    Stopped,
    /// Balance reached zero.
    Exhausted,
    /// The ticker aborted the run after a collaborator failure.
    Faulted,
}

/// Produced once per run when it returns to Idle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub service_id: ServiceId,
    /// Running time billed over the whole run, pauses excluded.
    pub billed_secs: f64,
    pub reason: EndReason,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Caller-facing view of the session.  Balance and remaining time are
/// rounded to whole units; the session itself keeps full precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub service_id: Option<ServiceId>,
    pub balance: f64,
    pub remaining_secs: f64,
    pub rate_per_minute: Option<f64>,
    pub fault: Option<RunFault>,
}
