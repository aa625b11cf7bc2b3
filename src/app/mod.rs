//! Application core — metering logic behind port traits.
//!
//! This module contains the business rules for the wash station: the
//! control facade, the billing ticker and the service catalog.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real relays.

pub mod catalog;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod supervisor;
