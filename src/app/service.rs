//! Control facade — the hexagonal core's only entry point.
//!
//! [`ControlFacade`] owns the shared station (session, relays, event sink)
//! and the billing ticker.  Every mutating call takes the station lock for
//! its whole duration, including the relay command, so a `state()` that
//! follows a successful call observes the post-transition state with the
//! relay already switched.
//!
//! ```text
//!  ClockPort ───▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │      ControlFacade        │
//! ActuatorPort ◀──│  MeteringSession · Ticker │ ◀── ServiceCatalog
//!                 └──────────────────────────┘
//! ```

use std::sync::Arc;

use log::{info, warn};

use crate::config::StationConfig;
use crate::error::{ControlError, Rejected};
use crate::session::{MeteringSession, RunSummary, SessionState, SessionStatus};

use super::commands::AppCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorPort, ClockPort, EventSink, ServiceCatalog};
use super::supervisor::{SessionSupervisor, Shared, Station};

/// Outcome of every control operation.
pub type ControlResult = Result<SessionState, Rejected>;

// ───────────────────────────────────────────────────────────────
// ControlFacade
// ───────────────────────────────────────────────────────────────

/// Thread-safe controller for one wash bay.
pub struct ControlFacade<A, C, S, E> {
    shared: Arc<Shared<A, C, E>>,
    supervisor: SessionSupervisor<A, C, E>,
    catalog: S,
    /// Clock reading at construction, origin for telemetry uptime.
    boot_secs: f64,
}

impl<A, C, S, E> ControlFacade<A, C, S, E>
where
    A: ActuatorPort + Send + 'static,
    C: ClockPort + Send + Sync + 'static,
    S: ServiceCatalog,
    E: EventSink + Send + 'static,
{
    /// Build the controller.  Every relay is released before the session
    /// becomes reachable.
    pub fn new(config: &StationConfig, mut actuator: A, clock: C, catalog: S, mut sink: E) -> Self {
        actuator.all_off();
        let session = MeteringSession::new(config.initial_balance);
        sink.emit(&AppEvent::Started(session.status()));
        info!(
            "Controller ready: balance {:.2} {}, tick {} ms",
            session.balance(),
            config.currency,
            config.tick_interval_ms
        );

        let boot_secs = clock.now_secs().unwrap_or(0.0);
        let shared = Arc::new(Shared::new(Station::new(session, actuator, sink), clock));
        let supervisor = SessionSupervisor::new(Arc::clone(&shared), config.tick_interval());
        Self {
            shared,
            supervisor,
            catalog,
            boot_secs,
        }
    }

    // ── Transitions ───────────────────────────────────────────

    /// Begin `service_id` at an explicit rate per minute.
    pub fn start(&self, service_id: &str, rate_per_minute: f64) -> ControlResult {
        let resolved = self.catalog.resolve_channel(service_id);

        let mut guard = self.shared.lock();
        let station = &mut *guard;
        let reject = |error: ControlError, session: &MeteringSession| {
            warn!("start({service_id}) rejected: {error}");
            Err(Rejected {
                error,
                state: session.snapshot(),
            })
        };

        let (Some(channel), Some(id)) = (resolved, crate::session::service_id(service_id)) else {
            return reject(ControlError::UnknownService, &station.session);
        };
        if self.shared.is_shutting_down() {
            return reject(ControlError::SupervisorUnavailable, &station.session);
        }
        if let Err(e) = station.session.start(
            id.clone(),
            channel,
            rate_per_minute,
            &self.shared.clock,
            &mut station.actuator,
        ) {
            return reject(e, &station.session);
        }

        if let Err(e) = self.supervisor.ensure_running(station) {
            // Without a ticker the run would never be billed or stopped.
            let _ = station.session.stop(&self.shared.clock, &mut station.actuator);
            return reject(e, &station.session);
        }

        station.sink.emit(&AppEvent::StateChanged {
            from: SessionStatus::Idle,
            to: SessionStatus::Running,
        });
        station.sink.emit(&AppEvent::RunStarted {
            service: id,
            channel: channel.0,
            rate_per_minute,
        });
        Ok(station.session.snapshot())
    }

    /// Begin `service_id` at its catalog price.
    pub fn start_listed(&self, service_id: &str) -> ControlResult {
        match self.catalog.price_per_minute(service_id) {
            Some(price) => self.start(service_id, price),
            None => Err(Rejected {
                error: ControlError::UnknownService,
                state: self.state(),
            }),
        }
    }

    pub fn pause(&self) -> ControlResult {
        let mut guard = self.shared.lock();
        let station = &mut *guard;
        match station
            .session
            .pause(&self.shared.clock, &mut station.actuator)
        {
            Ok(None) => {
                station.sink.emit(&AppEvent::StateChanged {
                    from: SessionStatus::Running,
                    to: SessionStatus::Paused,
                });
                Ok(station.session.snapshot())
            }
            Ok(Some(summary)) => {
                emit_run_ended(&mut station.sink, SessionStatus::Running, summary);
                Ok(station.session.snapshot())
            }
            Err(error) => {
                warn!("pause rejected: {error}");
                Err(Rejected {
                    error,
                    state: station.session.snapshot(),
                })
            }
        }
    }

    pub fn resume(&self) -> ControlResult {
        let mut guard = self.shared.lock();
        let station = &mut *guard;
        if let Err(error) = station
            .session
            .resume(&self.shared.clock, &mut station.actuator)
        {
            warn!("resume rejected: {error}");
            return Err(Rejected {
                error,
                state: station.session.snapshot(),
            });
        }
        station.sink.emit(&AppEvent::StateChanged {
            from: SessionStatus::Paused,
            to: SessionStatus::Running,
        });
        Ok(station.session.snapshot())
    }

    /// End the current run.  Always succeeds; a no-op when Idle.
    pub fn stop(&self) -> SessionState {
        let mut guard = self.shared.lock();
        let station = &mut *guard;
        let from = station.session.status();
        if let Some(summary) = station
            .session
            .stop(&self.shared.clock, &mut station.actuator)
        {
            emit_run_ended(&mut station.sink, from, summary);
        }
        station.session.snapshot()
    }

    /// Add credit to the wallet in any state.
    pub fn top_up(&self, amount: f64) -> ControlResult {
        let mut guard = self.shared.lock();
        let station = &mut *guard;
        match station.session.top_up(amount) {
            Ok(balance) => {
                station
                    .sink
                    .emit(&AppEvent::BalanceAdded { amount, balance });
                Ok(station.session.snapshot())
            }
            Err(error) => Err(Rejected {
                error,
                state: station.session.snapshot(),
            }),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.shared.lock().session.snapshot()
    }

    /// Build a telemetry snapshot.
    pub fn telemetry(&self) -> TelemetryData {
        let uptime_secs = self
            .shared
            .clock
            .now_secs()
            .map(|now| (now - self.boot_secs).max(0.0) as u64)
            .unwrap_or(0);
        let state = self.state();
        TelemetryData {
            status: state.status,
            service: state.service_id,
            balance: state.balance,
            remaining_secs: state.remaining_secs,
            uptime_secs,
            fault: state.fault,
        }
    }

    /// Emit a telemetry event through the station sink.
    pub fn emit_telemetry(&self) {
        let t = self.telemetry();
        self.shared.lock().sink.emit(&AppEvent::Telemetry(t));
    }

    /// Whether a ticker loop is currently alive.
    pub fn ticker_alive(&self) -> bool {
        self.shared.lock().ticker_alive()
    }

    /// Ticker loops spawned since construction.
    pub fn loops_spawned(&self) -> u32 {
        self.supervisor.loops_spawned()
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (serial console, coin acceptor, etc.).
    pub fn handle_command(&self, cmd: AppCommand) -> ControlResult {
        match cmd {
            AppCommand::Start { service, rate } => self.start(&service, rate),
            AppCommand::StartListed { service } => self.start_listed(&service),
            AppCommand::Pause => self.pause(),
            AppCommand::Resume => self.resume(),
            AppCommand::Stop => Ok(self.stop()),
            AppCommand::TopUp { amount } => self.top_up(amount),
            AppCommand::GetState => Ok(self.state()),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Stop any run, release every relay and join the ticker.
    ///
    /// New starts are refused before the run is stopped, so nothing can
    /// begin a run between the stop and the relay release.
    pub fn shutdown(&self) -> SessionState {
        self.shared.begin_shutdown();
        let state = self.stop();
        self.shared.lock().actuator.all_off();
        self.supervisor.shutdown();
        info!("Controller shut down");
        state
    }
}

/// Events for a run returning to Idle from `from`.
fn emit_run_ended(sink: &mut impl EventSink, from: SessionStatus, summary: RunSummary) {
    sink.emit(&AppEvent::StateChanged {
        from,
        to: SessionStatus::Idle,
    });
    sink.emit(&AppEvent::RunEnded {
        service: summary.service_id,
        billed_secs: summary.billed_secs,
        reason: summary.reason,
    });
}
