//! OpenAI-compatible chat-completions backend.
//!
//! Sends one `POST {base_url}/chat/completions` per request with bearer
//! auth. Works with the OpenAI API and compatible servers (vLLM, Ollama,
//! LocalAI).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationRequest, LlmBackend, LlmError};
use crate::config::LlmConfig;

pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl OpenAiBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_secs,
        })
    }

    /// Build from the `[llm]` section and an already-resolved key.
    pub fn from_config(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(config.base_url.clone(), api_key, config.timeout_secs)
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn map_transport_error(&self, e: &reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::Network(e.to_string())
        }
    }
}

/// gpt-5 family models only accept the default temperature and take
/// `max_completion_tokens` instead of `max_tokens`.
fn uses_completion_token_limit(model: &str) -> bool {
    model.to_ascii_lowercase().starts_with("gpt-5")
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

impl ChatRequest {
    fn from_request(request: &GenerationRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: request.system_prompt.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        let completion_limit = uses_completion_token_limit(&request.model);
        Self {
            model: request.model.clone(),
            messages,
            temperature: (!completion_limit).then_some(request.temperature),
            max_tokens: (!completion_limit).then_some(request.max_tokens),
            max_completion_tokens: completion_limit.then_some(request.max_tokens),
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let body = ChatRequest::from_request(request);
        debug!(kind = %request.kind, model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(self.chat_completions_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout_secs)
            } else {
                LlmError::InvalidResponse(e.to_string())
            }
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::RequestKind;

    fn request(model: &str) -> GenerationRequest {
        GenerationRequest {
            kind: RequestKind::Diagnosis,
            model: model.to_string(),
            system_prompt: "You are a diagnostician.".to_string(),
            prompt: "Explain.".to_string(),
            temperature: 0.3,
            max_tokens: 500,
        }
    }

    #[test]
    fn test_standard_model_sends_temperature() {
        let body = serde_json::to_value(ChatRequest::from_request(&request("gpt-4-turbo"))).unwrap();
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["max_tokens"], 500);
        assert!(body.get("max_completion_tokens").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[test]
    fn test_gpt5_uses_completion_token_limit() {
        let body = serde_json::to_value(ChatRequest::from_request(&request("gpt-5.1-chat-latest"))).unwrap();
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["max_completion_tokens"], 500);
    }

    #[test]
    fn test_url_trailing_slash_trimmed() {
        let backend = OpenAiBackend::new("http://localhost:8000/v1/", "sk-test", 5).unwrap();
        assert_eq!(backend.chat_completions_url(), "http://localhost:8000/v1/chat/completions");
    }
}
