//! Pipeline Configuration Module
//!
//! Every tunable the pipeline reads (cycle count, injection probability,
//! classifier training, model identifiers, threshold bounds) comes from a
//! TOML file, with built-in defaults for anything omitted.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` flag
//! 2. `TELEMETRY_PIPELINE_CONFIG` environment variable (path to TOML file)
//! 3. `pipeline.toml` in the current working directory
//! 4. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let (config, source) = PipelineConfig::load(cli.config.as_deref())?;
//! let coordinator = CycleCoordinator::from_config(&config, backend)?;
//! ```
//!
//! The config is passed by reference to whatever needs it; there is no
//! process-wide instance.

mod pipeline_config;
pub mod defaults;
pub mod validation;

pub use pipeline_config::*;
