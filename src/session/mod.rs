//! Resource-metering state machine for a single service run.
//!
//! ```text
//!            start                  pause
//!   Idle ───────────▶ Running ───────────▶ Paused
//!    ▲                 │  ▲                  │
//!    │  stop/exhaust   │  └──── resume ──────┘
//!    └─────────────────┴───────── stop ──────┘
//! ```
//!
//! The session owns the wallet balance and the billing clock bookkeeping.
//! Every transition commands the actuator through [`ActuatorPort`] so the
//! relay for the active channel is energised exactly while the session is
//! Running.  Billing uses the accumulated-elapsed formulation: each
//! settlement bills `now - running_since` and moves `running_since` to
//! `now`, so paused intervals are never billed and nothing is billed twice.
//!
//! The session is not thread-safe on its own; the facade and the ticker
//! share it behind one mutex.

pub mod state;

use log::{info, warn};

use crate::app::ports::{ActuatorPort, Channel, ClockPort};
use crate::error::{ControlError, Result, RunFault};

pub use state::{
    ActiveRun, EndReason, RunSummary, SERVICE_ID_CAP, ServiceId, SessionState, SessionStatus,
    service_id,
};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Running { run: ActiveRun, since: f64 },
    Paused { run: ActiveRun },
}

impl Phase {
    fn status(&self) -> SessionStatus {
        match self {
            Self::Idle => SessionStatus::Idle,
            Self::Running { .. } => SessionStatus::Running,
            Self::Paused { .. } => SessionStatus::Paused,
        }
    }

    fn run(&self) -> Option<&ActiveRun> {
        match self {
            Self::Idle => None,
            Self::Running { run, .. } | Self::Paused { run } => Some(run),
        }
    }
}

/// Result of one billing tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The session was not Running; nothing happened.
    Skipped,
    /// Time was billed and the run continues.
    Billed { balance: f64 },
    /// The balance reached zero and the run was stopped.
    Exhausted(RunSummary),
    /// A collaborator failed; the run was aborted without billing the
    /// interval since the last confirmed actuation.
    Faulted(RunSummary, RunFault),
}

// ---------------------------------------------------------------------------
// MeteringSession
// ---------------------------------------------------------------------------

/// Billing and timing state for one machine.
#[derive(Debug)]
pub struct MeteringSession {
    phase: Phase,
    balance: f64,
    /// Running time billed in the current (or last) run.
    accumulated_elapsed: f64,
    /// Fault that ended the last run, cleared by the next successful start.
    last_fault: Option<RunFault>,
}

impl MeteringSession {
    /// A new Idle session holding `initial_balance` (negative values clamp to 0).
    pub fn new(initial_balance: f64) -> Self {
        let balance = if initial_balance.is_finite() {
            initial_balance.max(0.0)
        } else {
            0.0
        };
        Self {
            phase: Phase::Idle,
            balance,
            accumulated_elapsed: 0.0,
            last_fault: None,
        }
    }

    // ── Transitions ──────────────────────────────────────────

    /// Begin a run of `service_id` on `channel` at `rate_per_minute`.
    ///
    /// Guards are checked before the clock or the actuator is touched.  If
    /// the relay refuses to energise, a best-effort de-energise is issued
    /// and the session stays Idle.
    pub fn start(
        &mut self,
        service_id: ServiceId,
        channel: Channel,
        rate_per_minute: f64,
        clock: &impl ClockPort,
        hw: &mut impl ActuatorPort,
    ) -> Result<()> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(ControlError::AlreadyActive);
        }
        if !rate_per_minute.is_finite() || rate_per_minute <= 0.0 {
            return Err(ControlError::InvalidRate);
        }
        if self.balance <= 0.0 {
            return Err(ControlError::InsufficientBalance);
        }
        let now = clock.now_secs()?;

        if let Err(e) = hw.set(channel, true) {
            warn!("Relay {channel} failed to energise ({e}), forcing off");
            let _ = hw.set(channel, false);
            return Err(ControlError::ActuatorFault(e));
        }

        self.accumulated_elapsed = 0.0;
        self.last_fault = None;
        info!(
            "Run started: {} on relay {} at {:.2}/min",
            service_id, channel, rate_per_minute
        );
        self.enter(Phase::Running {
            run: ActiveRun {
                service_id,
                rate_per_minute,
                channel,
            },
            since: now,
        });
        Ok(())
    }

    /// Settle billing up to now and de-energise.
    ///
    /// Returns `Some(summary)` if settling exhausted the balance, in which
    /// case the session is Idle instead of Paused.
    pub fn pause(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut impl ActuatorPort,
    ) -> Result<Option<RunSummary>> {
        let channel = match &self.phase {
            Phase::Running { run, .. } => run.channel,
            other => {
                return Err(ControlError::InvalidTransition {
                    op: "pause",
                    from: other.status(),
                });
            }
        };
        let now = clock.now_secs()?;
        hw.set(channel, false)?;

        self.settle(now);
        if self.balance <= 0.0 {
            return Ok(Some(self.finish(EndReason::Exhausted, hw)));
        }

        if let Some(run) = self.phase.run().cloned() {
            self.enter(Phase::Paused { run });
        }
        Ok(None)
    }

    /// Re-energise and restart the billing interval.  The balance and the
    /// accumulated time are left exactly as pause settled them.
    pub fn resume(&mut self, clock: &impl ClockPort, hw: &mut impl ActuatorPort) -> Result<()> {
        let channel = match &self.phase {
            Phase::Paused { run } => run.channel,
            other => {
                return Err(ControlError::InvalidTransition {
                    op: "resume",
                    from: other.status(),
                });
            }
        };
        let now = clock.now_secs()?;

        if let Err(e) = hw.set(channel, true) {
            warn!("Relay {channel} failed to re-energise ({e}), forcing off");
            let _ = hw.set(channel, false);
            return Err(ControlError::ActuatorFault(e));
        }

        if let Some(run) = self.phase.run().cloned() {
            self.enter(Phase::Running { run, since: now });
        }
        Ok(())
    }

    /// End the run from any state.  No-op (returns `None`) when Idle.
    ///
    /// A Running session is billed up to now if the clock answers; if it
    /// does not, the unconfirmed interval is left unbilled.
    pub fn stop(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut impl ActuatorPort,
    ) -> Option<RunSummary> {
        match self.phase {
            Phase::Idle => return None,
            Phase::Running { .. } => match clock.now_secs() {
                Ok(now) => self.settle(now),
                Err(e) => warn!("Stop without final settlement: clock {e}"),
            },
            Phase::Paused { .. } => {}
        }
        Some(self.finish(EndReason::Stopped, hw))
    }

    /// One billing step, driven by the supervisor.
    ///
    /// Re-asserts the energised level of the running channel first; a
    /// successful write is the actuation confirmation for the interval
    /// being billed.
    pub fn tick(&mut self, clock: &impl ClockPort, hw: &mut impl ActuatorPort) -> TickOutcome {
        let channel = match &self.phase {
            Phase::Running { run, .. } => run.channel,
            _ => return TickOutcome::Skipped,
        };

        let now = match clock.now_secs() {
            Ok(now) => now,
            Err(e) => {
                let fault = RunFault::Clock(e);
                return TickOutcome::Faulted(self.abort(fault, hw), fault);
            }
        };
        if let Err(e) = hw.set(channel, true) {
            let fault = RunFault::Actuator(e);
            return TickOutcome::Faulted(self.abort(fault, hw), fault);
        }

        self.settle(now);
        if self.balance <= 0.0 {
            info!("Balance exhausted, stopping run");
            TickOutcome::Exhausted(self.finish(EndReason::Exhausted, hw))
        } else {
            TickOutcome::Billed {
                balance: self.balance,
            }
        }
    }

    /// Force the run to Idle after a collaborator failure and record the fault.
    pub fn abort(&mut self, fault: RunFault, hw: &mut impl ActuatorPort) -> RunSummary {
        warn!("Run aborted: {fault}");
        self.last_fault = Some(fault);
        self.finish(EndReason::Faulted, hw)
    }

    /// Add credit.  Allowed in every state; a Running session keeps billing
    /// from the new balance.
    pub fn top_up(&mut self, amount: f64) -> Result<f64> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ControlError::InvalidAmount);
        }
        let balance = self.balance + amount;
        if !balance.is_finite() {
            return Err(ControlError::InvalidAmount);
        }
        self.balance = balance;
        info!("Balance topped up by {amount:.2} -> {:.2}", self.balance);
        Ok(self.balance)
    }

    // ── Queries ──────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.phase.status()
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn accumulated_elapsed(&self) -> f64 {
        self.accumulated_elapsed
    }

    pub fn active_run(&self) -> Option<&ActiveRun> {
        self.phase.run()
    }

    pub fn last_fault(&self) -> Option<RunFault> {
        self.last_fault
    }

    /// Seconds of service the balance still buys at the current rate;
    /// 0 when no run is active.
    pub fn remaining_secs(&self) -> f64 {
        match self.phase.run() {
            Some(run) => self.balance / run.rate_per_second(),
            None => 0.0,
        }
    }

    /// Caller-facing snapshot with rounded money and time.
    pub fn snapshot(&self) -> SessionState {
        let run = self.phase.run();
        SessionState {
            status: self.status(),
            service_id: run.map(|r| r.service_id.clone()),
            balance: self.balance.round(),
            remaining_secs: self.remaining_secs().round(),
            rate_per_minute: run.map(|r| r.rate_per_minute),
            fault: self.last_fault,
        }
    }

    // ── Internal ─────────────────────────────────────────────

    /// Bill the Running interval up to `now`, never below zero, and move
    /// `running_since` to `now`.
    fn settle(&mut self, now: f64) {
        let Phase::Running { run, since } = &mut self.phase else {
            return;
        };
        let elapsed = (now - *since).max(0.0);
        let rate = run.rate_per_second();
        let affordable = self.balance / rate;

        if elapsed >= affordable {
            self.accumulated_elapsed += affordable;
            self.balance = 0.0;
        } else {
            self.accumulated_elapsed += elapsed;
            self.balance = (self.balance - elapsed * rate).max(0.0);
        }
        *since = now;
    }

    /// Clear the run, de-energise best effort and summarise.
    fn finish(&mut self, reason: EndReason, hw: &mut impl ActuatorPort) -> RunSummary {
        let from = self.phase.status();
        let Some(run) = self.phase.run().cloned() else {
            return RunSummary {
                service_id: ServiceId::new(),
                billed_secs: self.accumulated_elapsed,
                reason,
            };
        };

        if let Err(e) = hw.set(run.channel, false) {
            warn!("Relay {} failed to de-energise: {e}", run.channel);
            if self.last_fault.is_none() {
                self.last_fault = Some(RunFault::Actuator(e));
            }
        }

        self.phase = Phase::Idle;
        info!("SESSION transition: {} -> Idle", from.name());
        info!(
            "Run ended ({:?}): {} billed {:.1}s, balance {:.2}",
            reason, run.service_id, self.accumulated_elapsed, self.balance
        );
        RunSummary {
            service_id: run.service_id,
            billed_secs: self.accumulated_elapsed,
            reason,
        }
    }

    fn enter(&mut self, next: Phase) {
        let from = self.phase.status();
        info!("SESSION transition: {} -> {}", from.name(), next.status().name());
        self.phase = next;
    }
}
