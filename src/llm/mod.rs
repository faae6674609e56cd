//! LLM Backend Module
//!
//! Provides a unified interface for the text-generation service used by the
//! diagnosis and resolution requesters.
//!
//! ## Architecture
//!
//! - **OpenAiBackend**: HTTPS chat-completions client for any
//!   OpenAI-compatible endpoint
//! - **StaticBackend**: canned replies for `--offline` runs and tests
//! - **generate_with_retry**: retries transient failures with a fixed backoff
//! - **parsing**: labelled-field extraction (`FIELD: value` lines)

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::config::LlmConfig;

mod openai;
pub mod parsing;
mod static_backend;

pub use openai::OpenAiBackend;
pub use parsing::{labelled_field, ParseError};
pub use static_backend::StaticBackend;

// ============================================================================
// Request / Error Types
// ============================================================================

/// What a generation request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Diagnosis,
    Resolution,
    /// Connectivity check from `check-api`
    Ping,
}

impl RequestKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Diagnosis => "diagnosis",
            Self::Resolution => "resolution",
            Self::Ping => "ping",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One prompt sent to the text-generation service
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: RequestKind,
    pub model: String,
    pub system_prompt: String,
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Rate limited by text-generation service")]
    RateLimited,

    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed service response: {0}")]
    InvalidResponse(String),

    #[error("Service returned an empty completion")]
    EmptyResponse,

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited => true,
            Self::Status { status, .. } => *status >= 500,
            Self::InvalidResponse(_) | Self::EmptyResponse | Self::Client(_) => false,
        }
    }
}

// ============================================================================
// Backend Trait
// ============================================================================

/// Unified trait for text-generation backends
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a reply for one request
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Get the backend name for logging
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// Retry
// ============================================================================

/// Fixed-backoff retry for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub const fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Call the backend, retrying transient errors up to `policy.max_retries`
/// times. Non-transient errors return immediately.
pub async fn generate_with_retry(
    backend: &dyn LlmBackend,
    request: &GenerationRequest,
    policy: RetryPolicy,
) -> Result<String, LlmError> {
    let mut attempt = 0;
    loop {
        match backend.generate(request).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    kind = %request.kind,
                    backend = backend.backend_name(),
                    attempt,
                    max_retries = policy.max_retries,
                    error = %e,
                    "Transient text-generation failure, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
