//! Shared data structures for the telemetry anomaly pipeline
//!
//! Data flows one way through a cycle:
//! - Reading (simulator output, four channels)
//! - Assessment (threshold violations + optional classifier verdict)
//! - Diagnosis (root cause for a confirmed anomaly)
//! - Recommendation (maintenance action for a diagnosis)

mod advisory;
mod assessment;
mod reading;

pub use advisory::*;
pub use assessment::*;
pub use reading::*;
