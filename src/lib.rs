//! Telemetry Pipeline: aircraft engine anomaly detection
//!
//! Simulated engine telemetry flows through a per-cycle pipeline.
//!
//! ## Architecture
//!
//! - **Acquisition**: telemetry simulator with fault injection
//! - **Threshold Checker**: fixed per-channel bounds
//! - **ML Engine**: isolation-forest outlier classifier, trained at startup
//! - **Requesters**: diagnosis and maintenance recommendation through a
//!   text-generation service
//! - **Pipeline**: cycle coordinator, bounded history, console report

pub mod acquisition;
pub mod agents;
pub mod config;
pub mod llm;
pub mod ml_engine;
pub mod pipeline;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, ConfigSource, PipelineConfig};

// Re-export commonly used types
pub use types::{
    Assessment, Channel, ClassifierVerdict, ConfirmedAnomaly, Diagnosis, Reading, Recommendation,
    Severity, Urgency,
};

// Re-export pipeline
pub use pipeline::{CycleCoordinator, CycleOutcome, History, PipelineError, RunReport};
