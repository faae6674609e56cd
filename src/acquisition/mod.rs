//! Telemetry acquisition module
//!
//! Produces engine readings from the built-in simulator.

pub mod simulator;

pub use simulator::{sample_nominal, TelemetrySimulator, NOMINAL_ENVELOPE};
