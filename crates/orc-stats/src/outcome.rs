use chrono::{DateTime, Utc};

/// Structured detail for a failed attempt.
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub kind: String,
    pub message: String,
}

/// The parsed form of a successful response's content, when a JSON schema
/// was requested. Plain (non-schema) responses leave `content` as the only
/// representation and never populate this. Parse failure is non-fatal: the
/// raw content is retained and `parsed_content` stays `None`.
#[derive(Debug, Clone)]
pub enum ParsedContent {
    Json(serde_json::Value),
}

/// The outcome of one request, success or terminal failure. Field order
/// matches the fixed serialization order consumers rely on for stable
/// row-wise columns.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub id: String,
    pub start_timestamp: DateTime<Utc>,
    pub success: bool,
    pub content: Option<String>,
    pub parsed_content: Option<ParsedContent>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub total_tokens: u64,
    pub cost: f64,
    pub error: Option<String>,
    pub error_details: Option<ErrorDetails>,
    pub api_response_time: f64,
    pub attempts: u32,
}

impl RequestOutcome {
    pub fn success(
        id: String,
        start_timestamp: DateTime<Utc>,
        content: String,
        parsed_content: Option<ParsedContent>,
        input_tokens: u64,
        output_tokens: u64,
        cached_tokens: u64,
        cost: f64,
        api_response_time: f64,
        attempts: u32,
    ) -> Self {
        Self {
            id,
            start_timestamp,
            success: true,
            content: Some(content),
            parsed_content,
            input_tokens,
            output_tokens,
            cached_tokens,
            total_tokens: input_tokens + output_tokens,
            cost,
            error: None,
            error_details: None,
            api_response_time,
            attempts,
        }
    }

    pub fn failure(
        id: String,
        start_timestamp: DateTime<Utc>,
        error: String,
        error_details: ErrorDetails,
        api_response_time: f64,
        attempts: u32,
    ) -> Self {
        Self {
            id,
            start_timestamp,
            success: false,
            content: None,
            parsed_content: None,
            input_tokens: 0,
            output_tokens: 0,
            cached_tokens: 0,
            total_tokens: 0,
            cost: 0.0,
            error: Some(error),
            error_details: Some(error_details),
            api_response_time,
            attempts,
        }
    }

    pub fn error_type(&self) -> Option<&str> {
        self.error_details.as_ref().map(|d| d.kind.as_str())
    }
}
