//! Fuzz target: `MeteringSession` transitions
//!
//! Interprets the input as a script of control operations, clock steps
//! and relay faults.  After every step the session must keep a finite,
//! non-negative balance and the relay must be energised exactly while a
//! run is Running.
//!
//! cargo fuzz run fuzz_session_ops

#![no_main]

use std::cell::Cell;

use libfuzzer_sys::fuzz_target;
use washstation::app::ports::{ActuatorPort, Channel, ClockPort};
use washstation::error::{ActuatorError, ClockError};
use washstation::session::{MeteringSession, SessionStatus, service_id};

struct StepClock(Cell<f64>);

impl ClockPort for StepClock {
    fn now_secs(&self) -> Result<f64, ClockError> {
        Ok(self.0.get())
    }
}

#[derive(Default)]
struct Relay {
    on: bool,
    broken: bool,
}

impl ActuatorPort for Relay {
    fn set(&mut self, _channel: Channel, energized: bool) -> Result<(), ActuatorError> {
        if self.broken && energized {
            return Err(ActuatorError::GpioWriteFailed { channel: 0 });
        }
        self.on = energized;
        Ok(())
    }

    fn all_off(&mut self) {
        self.on = false;
    }
}

fuzz_target!(|data: &[u8]| {
    let Some(water) = service_id("water") else {
        return;
    };
    let clock = StepClock(Cell::new(0.0));
    let mut relay = Relay::default();
    let mut session = MeteringSession::new(500.0);

    for pair in data.chunks(2) {
        let op = pair[0];
        let arg = f64::from(pair.get(1).copied().unwrap_or(0));

        match op % 8 {
            0 => {
                let _ = session.start(water.clone(), Channel(0), arg * 10.0, &clock, &mut relay);
            }
            1 => {
                let _ = session.pause(&clock, &mut relay);
            }
            2 => {
                let _ = session.resume(&clock, &mut relay);
            }
            3 => {
                let _ = session.stop(&clock, &mut relay);
            }
            4 => {
                let _ = session.tick(&clock, &mut relay);
            }
            5 => {
                let _ = session.top_up(arg);
            }
            6 => relay.broken = !relay.broken,
            _ => clock.0.set(clock.0.get() + arg / 4.0),
        }

        let balance = session.balance();
        assert!(balance.is_finite() && balance >= 0.0, "balance {balance}");
        assert_eq!(
            relay.on,
            session.status() == SessionStatus::Running,
            "relay level out of step with {:?}",
            session.status()
        );
    }
});
