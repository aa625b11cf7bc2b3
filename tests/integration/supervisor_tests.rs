//! Integration tests for the billing ticker thread.
//!
//! The clock is manual, so a tick bills exactly what the test advanced;
//! only the wake-up cadence is real time.

use std::sync::Arc;
use std::time::Duration;

use washstation::app::events::AppEvent;
use washstation::error::{ActuatorError, ClockError, RunFault};
use washstation::session::EndReason;
use washstation::SessionStatus;

use super::mock_hw::{Rig, wait_until};

const FAST_TICK_MS: u32 = 20;
const PATIENCE: Duration = Duration::from_secs(3);

#[test]
fn ticks_bill_running_time() {
    let r = Rig::new(1000.0, FAST_TICK_MS);
    r.facade.start("water", 60.0).unwrap();
    r.clock.advance(5.0);

    assert!(wait_until(PATIENCE, || r.facade.state().balance == 995.0));
    assert!(r.sink.any(|e| matches!(
        e,
        AppEvent::BalanceUpdated { balance, .. } if *balance == 995.0
    )));
    assert!(r.relays.is_on(0));
    r.facade.shutdown();
}

#[test]
fn exhaustion_stops_without_explicit_stop() {
    let r = Rig::new(10.0, FAST_TICK_MS);
    r.facade.start("water", 600.0).unwrap();
    r.clock.advance(1.0);

    assert!(wait_until(PATIENCE, || r.facade.state().status
        == SessionStatus::Idle));
    let state = r.facade.state();
    assert_eq!(state.balance, 0.0);
    assert_eq!(state.remaining_secs, 0.0);
    assert!(!r.relays.any_on());
    assert!(r.sink.any(|e| matches!(
        e,
        AppEvent::RunEnded {
            reason: EndReason::Exhausted,
            ..
        }
    )));
    assert!(wait_until(PATIENCE, || !r.facade.ticker_alive()));
}

#[test]
fn overshoot_is_clamped_at_zero() {
    let r = Rig::new(10.0, FAST_TICK_MS);
    r.facade.start("water", 600.0).unwrap();
    r.clock.advance(30.0);

    assert!(wait_until(PATIENCE, || r.facade.state().status
        == SessionStatus::Idle));
    assert_eq!(r.facade.state().balance, 0.0);
    assert!(r.sink.any(|e| matches!(
        e,
        AppEvent::RunEnded { billed_secs, .. } if (*billed_secs - 1.0).abs() < 1e-9
    )));
}

#[test]
fn paused_session_is_not_billed() {
    let r = Rig::new(100.0, FAST_TICK_MS);
    r.facade.start("water", 60.0).unwrap();
    r.facade.pause().unwrap();
    r.clock.advance(500.0);

    std::thread::sleep(Duration::from_millis(10 * u64::from(FAST_TICK_MS)));
    let state = r.facade.state();
    assert_eq!(state.status, SessionStatus::Paused);
    assert_eq!(state.balance, 100.0);
    assert!(r.facade.ticker_alive());
    r.facade.shutdown();
}

#[test]
fn clock_fault_aborts_run_and_is_reported() {
    let r = Rig::new(100.0, FAST_TICK_MS);
    r.facade.start("water", 60.0).unwrap();
    r.clock.advance(10.0);
    r.clock.set_unavailable(true);

    assert!(wait_until(PATIENCE, || r.facade.state().status
        == SessionStatus::Idle));
    let state = r.facade.state();
    assert_eq!(state.fault, Some(RunFault::Clock(ClockError::Unavailable)));
    // The unconfirmed interval is not billed.
    assert_eq!(state.balance, 100.0);
    assert!(!r.relays.any_on());
    assert!(r.sink.any(|e| *e
        == AppEvent::FaultDetected(RunFault::Clock(ClockError::Unavailable))));
}

#[test]
fn actuator_fault_aborts_run() {
    let r = Rig::new(100.0, FAST_TICK_MS);
    r.facade.start("foam", 60.0).unwrap();
    r.relays.fail_energize(true);

    assert!(wait_until(PATIENCE, || r.facade.state().status
        == SessionStatus::Idle));
    assert_eq!(
        r.facade.state().fault,
        Some(RunFault::Actuator(ActuatorError::GpioWriteFailed { channel: 1 }))
    );
    assert!(!r.relays.is_on(1));

    // The next successful start clears the fault.
    r.relays.fail_energize(false);
    assert_eq!(r.facade.start("foam", 60.0).unwrap().fault, None);
    r.facade.shutdown();
}

#[test]
fn quick_restart_reuses_draining_loop() {
    let r = Rig::new(100.0, 500);
    r.facade.start("water", 60.0).unwrap();
    r.facade.stop();
    r.facade.start("foam", 60.0).unwrap();
    r.facade.stop();
    r.facade.start("water", 60.0).unwrap();

    assert_eq!(r.facade.loops_spawned(), 1);
    assert!(r.facade.ticker_alive());
    r.facade.shutdown();
}

#[test]
fn new_loop_after_previous_exits() {
    let r = Rig::new(100.0, FAST_TICK_MS);
    r.facade.start("water", 60.0).unwrap();
    r.facade.stop();
    assert!(wait_until(PATIENCE, || !r.facade.ticker_alive()));

    r.facade.start("water", 60.0).unwrap();
    assert_eq!(r.facade.loops_spawned(), 2);
    assert!(r.facade.ticker_alive());
    r.facade.shutdown();
}

#[test]
fn shutdown_stops_run_and_joins_ticker() {
    let r = Rig::new(100.0, FAST_TICK_MS);
    r.facade.start("water", 60.0).unwrap();
    r.clock.advance(3.0);

    let state = r.facade.shutdown();
    assert_eq!(state.status, SessionStatus::Idle);
    assert!(!r.relays.any_on());
    assert!(!r.facade.ticker_alive());
    assert_eq!(state.balance, 97.0);
}

#[test]
fn ticker_that_died_mid_tick_is_replaced() {
    let r = Rig::new(1000.0, FAST_TICK_MS);
    r.sink.panic_on_next_balance_update();
    r.facade.start("water", 60.0).unwrap();
    r.clock.advance(1.0);

    // The first tick bills, then the loop unwinds out of the sink.
    assert!(wait_until(PATIENCE, || r.facade.state().balance == 999.0));
    std::thread::sleep(Duration::from_millis(5 * u64::from(FAST_TICK_MS)));

    r.facade.stop();
    r.facade.start("water", 60.0).unwrap();
    assert_eq!(r.facade.loops_spawned(), 2);

    r.clock.advance(2.0);
    assert!(wait_until(PATIENCE, || r.facade.state().balance == 997.0));
    r.facade.shutdown();
}

#[test]
fn live_ticker_and_concurrent_callers_keep_relay_coherent() {
    let r = Rig::new(1_000_000.0, FAST_TICK_MS);
    let facade = Arc::new(r.facade);
    let mut handles = Vec::new();

    for t in 0..4 {
        let f = Arc::clone(&facade);
        let clock = r.clock.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..100 {
                match (t + i) % 4 {
                    0 => {
                        let _ = f.start(if t % 2 == 0 { "water" } else { "foam" }, 60.0);
                    }
                    1 => {
                        let _ = f.pause();
                    }
                    2 => {
                        let _ = f.resume();
                    }
                    _ => {
                        clock.advance(0.5);
                        let _ = f.stop();
                    }
                }
                // Let the ticker land between calls.
                std::thread::sleep(Duration::from_millis(2));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    // One more tick cycle with nobody else touching the session.
    std::thread::sleep(Duration::from_millis(3 * u64::from(FAST_TICK_MS)));

    let state = facade.state();
    assert!(state.balance >= 0.0);
    match (state.status, state.service_id.as_deref()) {
        (SessionStatus::Running, Some(service)) => {
            let ch = if service == "foam" { 1 } else { 0 };
            assert!(r.relays.is_on(ch));
            assert!(!r.relays.is_on(1 - ch));
            assert!(facade.ticker_alive());
        }
        _ => assert!(!r.relays.any_on()),
    }

    let state = facade.shutdown();
    assert_eq!(state.status, SessionStatus::Idle);
    assert!(!r.relays.any_on());
}
