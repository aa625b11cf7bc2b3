//! Relay drivers and thread helpers.

pub mod relay;
pub mod task_pin;
