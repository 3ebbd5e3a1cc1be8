use async_trait::async_trait;
use std::time::Duration;

/// One chat message.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Requested output shape for JSON-mode responses.
#[derive(Debug, Clone)]
pub struct ResponseFormat {
    pub schema_name: String,
    pub schema: serde_json::Value,
}

/// One request to the remote inference service.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub response_format: Option<ResponseFormat>,
}

/// Token accounting reported by the remote service.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cached_tokens: Option<u32>,
}

/// A completed remote response.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub content: String,
    pub usage: Usage,
}

/// An error surfaced by the remote service. `retry_after`, when present, is
/// honored ahead of substring-based wait extraction.
#[derive(Debug, Clone)]
pub struct InferenceError {
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for InferenceError {}

/// The external remote-inference capability the orchestrator drives.
///
/// This crate ships no implementation; callers provide one backed by
/// whatever HTTP client and provider they use.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn submit(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError>;
}
