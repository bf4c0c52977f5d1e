//! Application core — pure domain logic, zero I/O.
//!
//! The control loop for the fridge monitor: door events, weight telemetry
//! and the zero-calibration command.  All interaction with hardware and the
//! network happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod topics;
