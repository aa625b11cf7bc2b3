//! GPIO pin assignments for the wash station relay board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Channel indices in the service catalog are
//! positions in [`RELAY_GPIOS`].

// ---------------------------------------------------------------------------
// Relay outputs (active HIGH, opto-isolated relay module)
// ---------------------------------------------------------------------------

/// Relay 1: water / osmosis pump.
pub const RELAY1_GPIO: i32 = 17;
/// Relay 2: chemicals / foam solenoid.
pub const RELAY2_GPIO: i32 = 18;

/// Number of relay channels on the board.
pub const RELAY_COUNT: usize = 2;

/// Relay GPIOs indexed by channel.
pub const RELAY_GPIOS: [i32; RELAY_COUNT] = [RELAY1_GPIO, RELAY2_GPIO];

