//! Shared infrastructure for the orchestration crates.
//!
//! - [`events`] — one-way telemetry pub/sub used by the rate limiter and orchestrator.
//! - [`error`] — error enums shared by the rate limiter, stats, and orchestrator crates.

pub mod error;
pub mod events;

pub use error::{ConfigError, OrchestratorError, ValidationError};
pub use events::{EventListener, EventListeners, FnListener, TelemetryEvent};
