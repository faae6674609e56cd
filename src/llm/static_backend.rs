//! Static text backend for offline runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use super::{GenerationRequest, LlmBackend, LlmError, RequestKind};

const OFFLINE_DIAGNOSIS: &str = "\
ROOT_CAUSE: Out-of-envelope reading consistent with a sensor or component fault on the flagged channel (offline canned analysis)
SEVERITY: HIGH
SUBSYSTEM: Engine core";

const OFFLINE_RESOLUTION: &str = "\
ACTION: Inspect the flagged subsystem and verify sensor calibration before next flight
URGENCY: HIGH
ESTIMATED_TIME: 2-4 hours
RESOURCES: Line maintenance technician, Borescope, Sensor calibration kit";

const OFFLINE_PING: &str = "OK";

/// Backend that answers every request with fixed text.
///
/// Replies are chosen by `RequestKind`. Kinds marked with `with_failure`
/// return a 503 error instead. Every call is counted.
pub struct StaticBackend {
    responses: HashMap<RequestKind, String>,
    failing: Vec<RequestKind>,
    call_count: AtomicU32,
}

impl StaticBackend {
    /// Same reply for every request kind.
    pub fn new(response: impl Into<String>) -> Self {
        let response = response.into();
        let responses = [RequestKind::Diagnosis, RequestKind::Resolution, RequestKind::Ping]
            .into_iter()
            .map(|kind| (kind, response.clone()))
            .collect();
        Self {
            responses,
            failing: Vec::new(),
            call_count: AtomicU32::new(0),
        }
    }

    /// Canned, well-formed replies for `--offline` runs
    pub fn offline() -> Self {
        Self::new(OFFLINE_PING)
            .with_response(RequestKind::Diagnosis, OFFLINE_DIAGNOSIS)
            .with_response(RequestKind::Resolution, OFFLINE_RESOLUTION)
    }

    /// Set the reply for one request kind.
    pub fn with_response(mut self, kind: RequestKind, response: impl Into<String>) -> Self {
        self.responses.insert(kind, response.into());
        self
    }

    /// Make every request of `kind` fail.
    pub fn with_failure(mut self, kind: RequestKind) -> Self {
        self.failing.push(kind);
        self
    }

    /// Number of `generate` calls so far, failed ones included
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for StaticBackend {
    fn default() -> Self {
        Self::offline()
    }
}

#[async_trait]
impl LlmBackend for StaticBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(&request.kind) {
            return Err(LlmError::Status {
                status: 503,
                body: format!("static backend configured to fail {} requests", request.kind),
            });
        }

        self.responses
            .get(&request.kind)
            .cloned()
            .ok_or(LlmError::EmptyResponse)
    }

    fn backend_name(&self) -> &'static str {
        "static"
    }
}
