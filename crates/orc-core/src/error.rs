//! Error types shared across the rate limiter, stats, and orchestrator crates.
//!
//! Each fallible surface gets its own `thiserror`-derived enum; the
//! orchestrator composes them into [`OrchestratorError`] rather than
//! exposing a single catch-all, since a configuration mistake and a
//! malformed batch request want different callers to handle them.

use thiserror::Error;

/// Construction-time misconfiguration. Always surfaced synchronously; never
/// retried.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("max_tpm must be positive, got {max_tpm}")]
    NonPositiveMaxTpm { max_tpm: i64 },

    #[error("model '{model}' does not support structured JSON output")]
    JsonSchemaUnsupported { model: String },
}

/// Caller-supplied batch shape is invalid. Raised before any request is
/// dispatched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("custom_ids length {got} does not match texts length {expected}")]
    CustomIdsLengthMismatch { expected: usize, got: usize },
}

/// Top-level error returned by the orchestrator's public entry points.
///
/// Per-item remote or rate-limit failures are not represented here — they
/// surface as a failed `RequestOutcome` instead, since a batch partially
/// failing is an expected outcome, not an exceptional one.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn is_config(&self) -> bool {
        matches!(self, OrchestratorError::Config(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, OrchestratorError::Validation(_))
    }
}
