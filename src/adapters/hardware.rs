//! Hardware adapter — bridges the relay board to [`ActuatorPort`].
//!
//! Owns one [`RelayDriver`] per channel.  This is the only module in the
//! system that touches relay outputs; channel `n` is `pins::RELAY_GPIOS[n]`.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::{ActuatorPort, Channel};
use crate::drivers::relay::{RelayDriver, SimPin};
use crate::error::ActuatorError;
use crate::pins;

/// Concrete adapter over a fixed set of relay outputs.
pub struct RelayBank<P> {
    relays: heapless::Vec<RelayDriver<P>, { pins::RELAY_COUNT }>,
}

impl<P: OutputPin> RelayBank<P> {
    /// Build from drivers ordered by channel index.  Extra drivers beyond
    /// [`pins::RELAY_COUNT`] are dropped with a warning.
    pub fn new(drivers: impl IntoIterator<Item = RelayDriver<P>>) -> Self {
        let mut relays = heapless::Vec::new();
        for driver in drivers {
            if relays.push(driver).is_err() {
                warn!("RelayBank: more drivers than relay channels, ignoring extra");
                break;
            }
        }
        info!("RelayBank: {} relay channel(s)", relays.len());
        Self { relays }
    }

    /// Current commanded level of `channel`, `None` if not wired.
    pub fn is_energized(&self, channel: Channel) -> Option<bool> {
        self.relays
            .get(usize::from(channel.0))
            .map(RelayDriver::is_energized)
    }
}

impl RelayBank<SimPin> {
    /// Every board GPIO backed by a logging simulation pin.
    pub fn simulated() -> Self {
        Self::new(pins::RELAY_GPIOS.iter().map(|&gpio| {
            match RelayDriver::new(SimPin::new(gpio), gpio) {
                Ok(driver) => driver,
                Err(never) => match never {},
            }
        }))
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<P: OutputPin> ActuatorPort for RelayBank<P> {
    fn set(&mut self, channel: Channel, energized: bool) -> Result<(), ActuatorError> {
        let relay = self
            .relays
            .get_mut(usize::from(channel.0))
            .ok_or(ActuatorError::UnknownChannel(channel.0))?;
        relay.set(energized).map_err(|_| {
            warn!(
                "Relay {} (GPIO{}) write failed",
                channel,
                relay.gpio()
            );
            ActuatorError::GpioWriteFailed { channel: channel.0 }
        })
    }

    fn all_off(&mut self) {
        for (ch, relay) in self.relays.iter_mut().enumerate() {
            if relay.set(false).is_err() {
                warn!("Relay {} (GPIO{}) failed to release", ch, relay.gpio());
            }
        }
    }
}
