//! Single relay output (pump / solenoid contactor).
//!
//! Generic over any `embedded-hal` 1.0 [`OutputPin`]: an ESP-IDF
//! `PinDriver` on the target, a [`SimPin`] on the host.
//!
//! ## Safety contract
//!
//! The relay is driven LOW (released) at construction.  The driver is a
//! dumb actuator; whether a relay may be energised is decided by the
//! metering session.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::info;

pub struct RelayDriver<P> {
    pin: P,
    gpio: i32,
    energized: bool,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Wrap `pin` (wired to `gpio`) and release the relay.
    pub fn new(mut pin: P, gpio: i32) -> Result<Self, P::Error> {
        pin.set_low()?;
        Ok(Self {
            pin,
            gpio,
            energized: false,
        })
    }

    /// Drive the coil.  The cached level is only updated on success.
    pub fn set(&mut self, energized: bool) -> Result<(), P::Error> {
        if energized {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.energized = energized;
        Ok(())
    }

    pub fn is_energized(&self) -> bool {
        self.energized
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }
}

// ---------------------------------------------------------------------------
// Simulation pin
// ---------------------------------------------------------------------------

/// Host-side stand-in for a GPIO output: logs every level change.
#[derive(Debug)]
pub struct SimPin {
    gpio: i32,
    high: bool,
}

impl SimPin {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, high: false }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        info!("[GPIO SIM] pin {} -> LOW", self.gpio);
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        info!("[GPIO SIM] pin {} -> HIGH", self.gpio);
        self.high = true;
        Ok(())
    }
}
