//! Sensor subsystem.
//!
//! - [`light`] — raw ambient-light sampling (ADC).
//! - [`door`] — debounced door state derived from light samples.
//! - [`weight`] — zero-offset and unit scaling over a load cell.

pub mod door;
pub mod light;
pub mod weight;
