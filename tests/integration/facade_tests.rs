//! Integration tests: ControlFacade → MeteringSession → relays.
//!
//! The ticker interval is set to its maximum so no billing tick fires
//! while these tests run; every balance change comes from an explicit
//! settle (pause/stop).

use std::sync::Arc;

use washstation::app::commands::AppCommand;
use washstation::app::events::AppEvent;
use washstation::error::{ActuatorError, ClockError, ControlError};
use washstation::session::EndReason;
use washstation::SessionStatus;

use super::mock_hw::{RelayCall, Rig};

const SLOW_TICK_MS: u32 = 10_000;

fn rig(balance: f64) -> Rig {
    Rig::new(balance, SLOW_TICK_MS)
}

// ── Construction ──────────────────────────────────────────────

#[test]
fn boot_releases_all_relays() {
    let r = rig(100.0);
    assert_eq!(r.relays.calls(), vec![RelayCall::AllOff]);
    assert_eq!(r.sink.events(), vec![AppEvent::Started(SessionStatus::Idle)]);
    let state = r.facade.state();
    assert_eq!(state.status, SessionStatus::Idle);
    assert_eq!(state.balance, 100.0);
    assert_eq!(state.service_id, None);
    assert_eq!(state.remaining_secs, 0.0);
}

// ── Start ─────────────────────────────────────────────────────

#[test]
fn start_is_visible_immediately() {
    let r = rig(100.0);
    let state = r.facade.start("foam", 60.0).unwrap();
    assert_eq!(state.status, SessionStatus::Running);
    assert_eq!(state.service_id.as_deref(), Some("foam"));
    assert_eq!(state.rate_per_minute, Some(60.0));
    assert_eq!(state.remaining_secs, 100.0);

    // The relay was commanded before start returned.
    assert!(r.relays.is_on(1));
    assert!(!r.relays.is_on(0));
    assert_eq!(r.facade.state(), state);
}

#[test]
fn start_while_running_is_already_active() {
    let r = rig(100.0);
    r.facade.start("water", 60.0).unwrap();
    let calls = r.relays.calls().len();

    let rej = r.facade.start("foam", 30.0).unwrap_err();
    assert_eq!(rej.error, ControlError::AlreadyActive);
    assert_eq!(rej.state.service_id.as_deref(), Some("water"));
    assert_eq!(rej.state.rate_per_minute, Some(60.0));
    assert_eq!(r.relays.calls().len(), calls);
    assert!(!r.relays.is_on(1));
}

#[test]
fn start_while_paused_is_already_active() {
    let r = rig(100.0);
    r.facade.start("water", 60.0).unwrap();
    r.facade.pause().unwrap();
    let rej = r.facade.start("water", 60.0).unwrap_err();
    assert_eq!(rej.error, ControlError::AlreadyActive);
    assert_eq!(rej.state.status, SessionStatus::Paused);
}

#[test]
fn invalid_rate_never_energizes() {
    let r = rig(100.0);
    for rate in [0.0, -5.0] {
        let rej = r.facade.start("water", rate).unwrap_err();
        assert_eq!(rej.error, ControlError::InvalidRate);
        assert_eq!(rej.state.status, SessionStatus::Idle);
    }
    assert_eq!(r.relays.energize_attempts(), 0);
    assert_eq!(r.facade.loops_spawned(), 0);
}

#[test]
fn unknown_service_stays_idle() {
    let r = rig(100.0);
    let rej = r.facade.start("nonexistent", 10.0).unwrap_err();
    assert_eq!(rej.error, ControlError::UnknownService);
    assert_eq!(r.facade.state().status, SessionStatus::Idle);
    assert_eq!(r.relays.energize_attempts(), 0);
}

#[test]
fn empty_wallet_needs_top_up() {
    let r = rig(0.0);
    assert_eq!(
        r.facade.start("water", 60.0).unwrap_err().error,
        ControlError::InsufficientBalance
    );

    let state = r.facade.top_up(30.0).unwrap();
    assert_eq!(state.balance, 30.0);
    assert!(r.sink.any(|e| *e
        == AppEvent::BalanceAdded {
            amount: 30.0,
            balance: 30.0
        }));
    assert_eq!(r.facade.start("water", 60.0).unwrap().remaining_secs, 30.0);
}

#[test]
fn top_up_rejects_bad_amounts() {
    let r = rig(10.0);
    for amount in [0.0, -1.0, f64::INFINITY] {
        let rej = r.facade.top_up(amount).unwrap_err();
        assert_eq!(rej.error, ControlError::InvalidAmount);
        assert_eq!(rej.state.balance, 10.0);
    }
}

#[test]
fn energize_failure_rejects_and_forces_off() {
    let r = rig(100.0);
    r.relays.fail_energize(true);
    let rej = r.facade.start("water", 60.0).unwrap_err();
    assert_eq!(
        rej.error,
        ControlError::ActuatorFault(ActuatorError::GpioWriteFailed { channel: 0 })
    );
    assert_eq!(rej.state.status, SessionStatus::Idle);
    assert_eq!(
        r.relays.calls().last(),
        Some(&RelayCall::Set {
            channel: 0,
            energized: false
        })
    );
    assert!(!r.relays.any_on());
}

#[test]
fn start_listed_uses_catalog_price() {
    let r = rig(100.0);
    let state = r.facade.start_listed("foam").unwrap();
    assert_eq!(state.rate_per_minute, Some(1200.0));
    assert_eq!(
        r.facade.start_listed("nope").unwrap_err().error,
        ControlError::UnknownService
    );
}

// ── Pause / resume ────────────────────────────────────────────

#[test]
fn pause_resume_does_not_double_bill() {
    let r = rig(1000.0);
    r.facade.start("water", 60.0).unwrap();

    r.clock.advance(10.0);
    let paused = r.facade.pause().unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    assert_eq!(paused.balance, 990.0);
    assert!(!r.relays.is_on(0));

    r.clock.advance(3600.0);
    let resumed = r.facade.resume().unwrap();
    assert_eq!(resumed.status, SessionStatus::Running);
    assert_eq!(resumed.balance, 990.0);
    assert!(r.relays.is_on(0));

    r.clock.advance(5.0);
    let stopped = r.facade.stop();
    assert_eq!(stopped.balance, 985.0);
    assert!(r.sink.any(|e| matches!(
        e,
        AppEvent::RunEnded { billed_secs, reason: EndReason::Stopped, .. }
            if (*billed_secs - 15.0).abs() < 1e-9
    )));
}

#[test]
fn pause_and_resume_guards() {
    let r = rig(100.0);
    let rej = r.facade.pause().unwrap_err();
    assert_eq!(
        rej.error,
        ControlError::InvalidTransition {
            op: "pause",
            from: SessionStatus::Idle
        }
    );
    assert!(r.facade.resume().is_err());

    r.facade.start("water", 60.0).unwrap();
    let rej = r.facade.resume().unwrap_err();
    assert!(matches!(rej.error, ControlError::InvalidTransition { op: "resume", .. }));
    assert_eq!(rej.state.status, SessionStatus::Running);
}

#[test]
fn pause_with_broken_clock_changes_nothing() {
    let r = rig(100.0);
    r.facade.start("water", 60.0).unwrap();
    r.clock.set_unavailable(true);
    let rej = r.facade.pause().unwrap_err();
    assert_eq!(rej.error, ControlError::ClockFault(ClockError::Unavailable));
    assert_eq!(rej.state.status, SessionStatus::Running);
    assert!(r.relays.is_on(0));
}

#[test]
fn pause_that_exhausts_ends_the_run() {
    let r = rig(10.0);
    r.facade.start("water", 60.0).unwrap();
    r.clock.advance(60.0);
    let state = r.facade.pause().unwrap();
    assert_eq!(state.status, SessionStatus::Idle);
    assert_eq!(state.balance, 0.0);
    assert!(!r.relays.any_on());
    assert!(r.sink.any(|e| matches!(
        e,
        AppEvent::RunEnded {
            reason: EndReason::Exhausted,
            ..
        }
    )));
}

// ── Stop ──────────────────────────────────────────────────────

#[test]
fn stop_is_idempotent_on_idle() {
    let r = rig(100.0);
    let before = r.facade.state();
    assert_eq!(r.facade.stop(), before);
    assert_eq!(r.facade.stop(), before);
    assert_eq!(r.relays.calls(), vec![RelayCall::AllOff]);
}

#[test]
fn stop_keeps_wallet_for_next_run() {
    let r = rig(100.0);
    r.facade.start("water", 60.0).unwrap();
    r.clock.advance(40.0);
    let state = r.facade.stop();
    assert_eq!(state.status, SessionStatus::Idle);
    assert_eq!(state.balance, 60.0);
    assert_eq!(state.service_id, None);
    assert!(!r.relays.any_on());

    let again = r.facade.start("foam", 120.0).unwrap();
    assert_eq!(again.balance, 60.0);
    assert_eq!(again.remaining_secs, 30.0);
}

#[test]
fn stop_with_release_failure_still_goes_idle() {
    let r = rig(100.0);
    r.facade.start("water", 60.0).unwrap();
    r.relays.fail_release(true);
    let state = r.facade.stop();
    assert_eq!(state.status, SessionStatus::Idle);
    assert!(state.fault.is_some());
}

// ── Events & commands ─────────────────────────────────────────

#[test]
fn run_lifecycle_events() {
    let r = rig(100.0);
    r.sink.clear();
    r.facade.start("water", 60.0).unwrap();
    r.clock.advance(2.0);
    r.facade.stop();

    let events = r.sink.events();
    assert_eq!(
        events[0],
        AppEvent::StateChanged {
            from: SessionStatus::Idle,
            to: SessionStatus::Running
        }
    );
    assert!(matches!(events[1], AppEvent::RunStarted { channel: 0, .. }));
    assert_eq!(
        events[2],
        AppEvent::StateChanged {
            from: SessionStatus::Running,
            to: SessionStatus::Idle
        }
    );
    assert!(matches!(
        events[3],
        AppEvent::RunEnded {
            reason: EndReason::Stopped,
            ..
        }
    ));
}

#[test]
fn json_commands_drive_the_facade() {
    let r = rig(100.0);
    let cmd = AppCommand::parse(r#"{"action":"start","service":"water","rate":30}"#).unwrap();
    assert_eq!(r.facade.handle_command(cmd).unwrap().status, SessionStatus::Running);
    assert_eq!(
        r.facade
            .handle_command(AppCommand::parse(r#"{"action":"pause"}"#).unwrap())
            .unwrap()
            .status,
        SessionStatus::Paused
    );
    assert_eq!(
        r.facade.handle_command(AppCommand::GetState).unwrap().status,
        SessionStatus::Paused
    );
    assert_eq!(
        r.facade.handle_command(AppCommand::Stop).unwrap().status,
        SessionStatus::Idle
    );
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn concurrent_callers_keep_relay_coherent() {
    let r = rig(1_000_000.0);
    let facade = Arc::new(r.facade);
    let mut handles = Vec::new();

    for t in 0..6 {
        let f = Arc::clone(&facade);
        let clock = r.clock.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..200 {
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
                        clock.advance(0.01);
                        let _ = f.stop();
                    }
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let state = facade.state();
    assert!(state.balance >= 0.0);
    let channel = match state.service_id.as_deref() {
        Some("foam") => Some(1),
        Some(_) => Some(0),
        None => None,
    };
    match (state.status, channel) {
        (SessionStatus::Running, Some(ch)) => {
            assert!(r.relays.is_on(ch));
            assert!(!r.relays.is_on(1 - ch));
        }
        _ => assert!(!r.relays.any_on()),
    }
}
