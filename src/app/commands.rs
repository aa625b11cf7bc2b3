//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (serial console,
//! coin acceptor, a kiosk UI) that the
//! [`ControlFacade`](super::service::ControlFacade) interprets and acts
//! upon.  Each command is one JSON object tagged by `action`:
//!
//! ```text
//! {"action":"start","service":"water","rate":1000}
//! {"action":"start_listed","service":"foam"}
//! {"action":"top_up","amount":5000}
//! {"action":"stop"}
//! ```

use log::warn;
use serde::{Deserialize, Serialize};

use super::service::ControlResult;
use crate::session::{ServiceId, SessionState};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AppCommand {
    /// Begin a run at an explicit rate per minute.
    Start { service: ServiceId, rate: f64 },

    /// Begin a run at the catalog's list price.
    StartListed { service: ServiceId },

    Pause,

    Resume,

    /// End the current run; always succeeds.
    Stop,

    /// Add credit to the wallet (coin acceptor / cashier).
    TopUp { amount: f64 },

    /// Report the current session state without changing it.
    GetState,
}

impl AppCommand {
    /// Parse one console line.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

/// One JSON line written back to the console per command.
#[derive(Debug, Serialize)]
pub struct CommandReply<'a> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<&'a SessionState>,
}

impl<'a> CommandReply<'a> {
    pub fn from_result(result: &'a ControlResult) -> Self {
        match result {
            Ok(state) => Self {
                ok: true,
                error: None,
                state: Some(state),
            },
            Err(rej) => Self {
                ok: false,
                error: Some(rej.error.to_string()),
                state: Some(&rej.state),
            },
        }
    }

    /// Reply for a line that did not parse as an [`AppCommand`].
    pub fn bad_command(e: &serde_json::Error) -> Self {
        Self {
            ok: false,
            error: Some(format!("bad command: {e}")),
            state: None,
        }
    }

    /// Render as a single JSON line.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            warn!("Reply encode failed: {e}");
            String::from(r#"{"ok":false}"#)
        })
    }
}
