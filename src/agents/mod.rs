//! Per-cycle agents of the telemetry anomaly pipeline
//!
//! ## Processing Pipeline Agents
//!
//! - **Threshold Checker**: fixed per-channel bounds, flags suspect readings
//! - **Diagnosis Requester**: root cause + severity for a confirmed anomaly
//! - **Resolution Requester**: maintenance action + urgency for a diagnosis
//!
//! Both requesters call the text-generation service through `LlmBackend`
//! and parse a labelled-field reply. Service and parse failures surface as
//! `RequestError`, which the coordinator treats as recoverable.

pub mod diagnosis;
pub mod resolution;
pub mod threshold_checker;

pub use diagnosis::DiagnosisRequester;
pub use resolution::ResolutionRequester;
pub use threshold_checker::ThresholdChecker;

use thiserror::Error;

use crate::llm::{LlmError, ParseError, RetryPolicy};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("text-generation service failed: {0}")]
    Service(#[from] LlmError),

    #[error("malformed reply: {0}")]
    Parse(#[from] ParseError),
}

/// Model and sampling settings shared by a requester's calls
#[derive(Debug, Clone)]
pub struct RequestSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub retry: RetryPolicy,
    /// History entries embedded in each prompt
    pub history_in_prompt: usize,
}
