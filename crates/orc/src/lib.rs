//! Adaptive rate-limited batch orchestration for remote inference calls.
//!
//! [`Orchestrator`] dispatches prompts to a caller-supplied [`InferenceClient`]
//! while staying under a tokens-per-minute budget (via `orc-ratelimiter`),
//! retrying transient failures (via `orc-retry`), and aggregating cost and
//! reliability statistics per batch and globally (via `orc-stats`).
//!
//! # Example
//!
//! ```no_run
//! use orc::{InferenceClient, InferenceRequest, InferenceResponse, InferenceError, Orchestrator};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct MyClient;
//!
//! #[async_trait]
//! impl InferenceClient for MyClient {
//!     async fn submit(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
//!         unimplemented!()
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = Orchestrator::builder()
//!     .model("gpt-test")
//!     .max_tpm(60_000)
//!     .client(Arc::new(MyClient))
//!     .build()?;
//!
//! let outcome = orchestrator
//!     .process_single("hello", "Summarize: {text}", None, None, &Default::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod batch;
mod classify;
mod client;
mod config;
mod enrich;
mod orchestrator;
mod template;

pub use batch::BatchItem;
pub use client::{
    InferenceClient, InferenceError, InferenceRequest, InferenceResponse, Message, ResponseFormat,
    Usage,
};
pub use config::{OrchestratorConfig, OrchestratorConfigBuilder};
pub use enrich::{IdentityEnricher, PromptEnricher};
pub use orchestrator::{BatchResult, Orchestrator};

pub use orc_core::{ConfigError, OrchestratorError, ValidationError};
pub use orc_stats::{ErrorDetails, ModelPricing, ParsedContent, PricingTable, RequestOutcome, StatsContainer, StatsManager};
