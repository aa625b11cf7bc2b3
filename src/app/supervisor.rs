//! Billing ticker, the background half of the controller.
//!
//! One named thread per active run wakes every `tick_interval`, takes the
//! station lock, and calls [`MeteringSession::tick`].  The sleep happens
//! outside the lock so control calls are never blocked by the ticker.
//!
//! ```text
//!   sleep ──▶ shutdown? ──▶ lock ──▶ Idle?    → mark stopped, exit
//!     ▲                              Paused?  → skip
//!     │                              Running  → tick, emit events
//!     └──────────────────────────────────────────┘
//! ```
//!
//! At most one loop exists: the flag `ticker_alive` lives inside the
//! station lock, is set by whoever spawns the loop and cleared by the loop
//! itself just before it exits.  A `start` that finds the flag still set
//! reuses the draining loop instead of spawning a second one, unless its
//! thread has already finished (it unwound without clearing the flag).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{info, warn};

use crate::drivers::task_pin::{self, Core};
use crate::error::ControlError;
use crate::session::{MeteringSession, RunSummary, SessionStatus, TickOutcome};

use super::events::AppEvent;
use super::ports::{ActuatorPort, ClockPort, EventSink};

/// FreeRTOS priority of the ticker task (above the console, below WiFi).
const TICKER_PRIORITY: u8 = 10;
/// Ticker stack (KB).  The loop only formats log lines.
const TICKER_STACK_KB: usize = 8;

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

/// Everything mutated under the station lock.
pub struct Station<A, E> {
    pub session: MeteringSession,
    pub actuator: A,
    pub sink: E,
    ticker_alive: bool,
    ticker: Option<JoinHandle<()>>,
}

impl<A, E> Station<A, E> {
    pub fn new(session: MeteringSession, actuator: A, sink: E) -> Self {
        Self {
            session,
            actuator,
            sink,
            ticker_alive: false,
            ticker: None,
        }
    }

    pub fn ticker_alive(&self) -> bool {
        self.ticker_alive
    }
}

/// State shared between the facade and the ticker thread.
pub struct Shared<A, C, E> {
    station: Mutex<Station<A, E>>,
    pub clock: C,
    shutdown: AtomicBool,
}

impl<A, C, E> Shared<A, C, E> {
    pub fn new(station: Station<A, E>, clock: C) -> Self {
        Self {
            station: Mutex::new(station),
            clock,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Acquire the station lock.  A panicked holder cannot leave the
    /// session half-transitioned (every transition commits last), so a
    /// poisoned lock is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, Station<A, E>> {
        self.station.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Raise the shutdown flag under the station lock.  Any `start` that
    /// already holds the lock completes first; every later one sees the flag.
    pub fn begin_shutdown(&self) {
        let _guard = self.lock();
        self.shutdown.store(true, Ordering::Release);
    }
}

// ───────────────────────────────────────────────────────────────
// SessionSupervisor
// ───────────────────────────────────────────────────────────────

/// Owns the lifecycle of the billing ticker thread.
pub struct SessionSupervisor<A, C, E> {
    shared: Arc<Shared<A, C, E>>,
    interval: Duration,
    spawned: AtomicU32,
}

impl<A, C, E> SessionSupervisor<A, C, E>
where
    A: ActuatorPort + Send + 'static,
    C: ClockPort + Send + Sync + 'static,
    E: EventSink + Send + 'static,
{
    pub fn new(shared: Arc<Shared<A, C, E>>, interval: Duration) -> Self {
        Self {
            shared,
            interval,
            spawned: AtomicU32::new(0),
        }
    }

    /// Make sure a ticker loop is alive for the run that was just started.
    ///
    /// Must be called with the station lock held (`station` is the guarded
    /// value).  Reuses a loop that has not yet observed the previous run's
    /// end; otherwise reaps the finished handle and spawns a fresh loop.
    pub fn ensure_running(&self, station: &mut Station<A, E>) -> Result<(), ControlError> {
        if self.shared.is_shutting_down() {
            return Err(ControlError::SupervisorUnavailable);
        }
        if station.ticker_alive {
            if !station.ticker.as_ref().is_some_and(JoinHandle::is_finished) {
                return Ok(());
            }
            // A loop that unwound never cleared its flag.
            warn!("Ticker died while marked alive, respawning");
            station.ticker_alive = false;
        }

        // The previous loop is finished or cleared `ticker_alive` under this
        // lock and touches nothing shared afterwards, so joining here cannot
        // block on us.
        if let Some(old) = station.ticker.take() {
            if old.join().is_err() {
                warn!("Previous ticker thread panicked");
            }
        }

        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        let handle = task_pin::spawn_on_core(
            Core::App,
            TICKER_PRIORITY,
            TICKER_STACK_KB,
            "meter-tick\0",
            move || run_loop(&shared, interval),
        )
        .map_err(|e| {
            warn!("Ticker spawn failed: {e}");
            ControlError::SupervisorUnavailable
        })?;

        station.ticker_alive = true;
        station.ticker = Some(handle);
        self.spawned.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Signal the loop to exit and wait for it.  Must be called WITHOUT the
    /// station lock held.
    pub fn shutdown(&self) {
        self.shared.begin_shutdown();
        let handle = self.shared.lock().ticker.take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Ticker thread panicked");
            }
        }
    }

    /// Number of ticker loops spawned since construction.
    pub fn loops_spawned(&self) -> u32 {
        self.spawned.load(Ordering::Relaxed)
    }
}

impl<A, C, E> Drop for SessionSupervisor<A, C, E> {
    fn drop(&mut self) {
        // A detached loop exits on its next wake.
        self.shared.shutdown.store(true, Ordering::Release);
    }
}

// ───────────────────────────────────────────────────────────────
// Loop body
// ───────────────────────────────────────────────────────────────

fn run_loop<A, C, E>(shared: &Shared<A, C, E>, interval: Duration)
where
    A: ActuatorPort,
    C: ClockPort,
    E: EventSink,
{
    info!("Ticker started ({} ms)", interval.as_millis());
    loop {
        std::thread::sleep(interval);

        let mut guard = shared.lock();
        if shared.is_shutting_down() {
            guard.ticker_alive = false;
            info!("Ticker exiting: shutdown");
            return;
        }

        let station = &mut *guard;
        match station.session.status() {
            SessionStatus::Idle => {
                station.ticker_alive = false;
                info!("Ticker exiting: session idle");
                return;
            }
            SessionStatus::Paused => continue,
            SessionStatus::Running => {}
        }

        match station.session.tick(&shared.clock, &mut station.actuator) {
            TickOutcome::Skipped => {}
            TickOutcome::Billed { balance } => {
                station.sink.emit(&AppEvent::BalanceUpdated {
                    balance,
                    remaining_secs: station.session.remaining_secs(),
                });
            }
            TickOutcome::Exhausted(summary) => {
                station.sink.emit(&AppEvent::BalanceUpdated {
                    balance: 0.0,
                    remaining_secs: 0.0,
                });
                emit_run_ended(&mut station.sink, summary);
                station.ticker_alive = false;
                return;
            }
            TickOutcome::Faulted(summary, fault) => {
                station.sink.emit(&AppEvent::FaultDetected(fault));
                emit_run_ended(&mut station.sink, summary);
                station.ticker_alive = false;
                return;
            }
        }
    }
}

/// Events for a run that the ticker ended (it was Running).
fn emit_run_ended(sink: &mut impl EventSink, summary: RunSummary) {
    sink.emit(&AppEvent::StateChanged {
        from: SessionStatus::Running,
        to: SessionStatus::Idle,
    });
    sink.emit(&AppEvent::RunEnded {
        service: summary.service_id,
        billed_secs: summary.billed_secs,
        reason: summary.reason,
    });
}
