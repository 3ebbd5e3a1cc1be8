use orc_core::events::TelemetryEvent;
use std::time::{Duration, Instant};

/// Events emitted by the adaptive rate limiter. Delivery is one-way and
/// must never block the limiter; see [`crate::limiter::AdaptiveRateLimiter`].
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// The caller had to wait for a concurrency slot before proceeding.
    ProactivePause {
        name: String,
        timestamp: Instant,
        wait_time: Duration,
    },
    /// The provider signaled a rate limit; capacity was halved.
    ApiRateLimitDetected {
        name: String,
        timestamp: Instant,
        wait_time: Duration,
    },
    /// The sliding window's total changed.
    TokenUsageUpdate {
        name: String,
        timestamp: Instant,
        current_tpm: u64,
    },
    /// The capacity controller retargeted the gate.
    ConcurrencyUpdate {
        name: String,
        timestamp: Instant,
        new_concurrency: usize,
    },
}

impl TelemetryEvent for RateLimiterEvent {
    fn kind(&self) -> &'static str {
        match self {
            RateLimiterEvent::ProactivePause { .. } => "proactive_pause",
            RateLimiterEvent::ApiRateLimitDetected { .. } => "api_rate_limit_detected",
            RateLimiterEvent::TokenUsageUpdate { .. } => "token_usage_update",
            RateLimiterEvent::ConcurrencyUpdate { .. } => "concurrency_update",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::ProactivePause { timestamp, .. }
            | RateLimiterEvent::ApiRateLimitDetected { timestamp, .. }
            | RateLimiterEvent::TokenUsageUpdate { timestamp, .. }
            | RateLimiterEvent::ConcurrencyUpdate { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            RateLimiterEvent::ProactivePause { name, .. }
            | RateLimiterEvent::ApiRateLimitDetected { name, .. }
            | RateLimiterEvent::TokenUsageUpdate { name, .. }
            | RateLimiterEvent::ConcurrencyUpdate { name, .. } => name,
        }
    }
}
