use crate::events::RateLimiterEvent;
use orc_core::events::{EventListeners, FnListener};
use orc_core::ConfigError;
use std::time::Duration;

/// Configuration for an [`crate::AdaptiveRateLimiter`].
pub struct RateLimiterConfig {
    pub(crate) max_tpm: u64,
    pub(crate) initial_concurrency: usize,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    max_tpm: u64,
    initial_concurrency: usize,
    name: String,
    event_listeners: EventListeners<RateLimiterEvent>,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults: `initial_concurrency: 10`, `name: "<unnamed>"`. `max_tpm`
    /// has no sensible default and must be set explicitly before `build`.
    pub fn new() -> Self {
        Self {
            max_tpm: 0,
            initial_concurrency: 10,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the provider's tokens-per-minute ceiling. Required.
    pub fn max_tpm(mut self, max_tpm: u64) -> Self {
        self.max_tpm = max_tpm;
        self
    }

    /// Sets the starting concurrency before any tuning decision has run.
    pub fn initial_concurrency(mut self, concurrency: usize) -> Self {
        self.initial_concurrency = concurrency;
        self
    }

    /// Sets the name used to tag emitted events.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked whenever a caller had to wait for a slot.
    pub fn on_proactive_pause<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::ProactivePause { wait_time, .. } = event {
                f(*wait_time);
            }
        }));
        self
    }

    /// Registers a callback invoked when the provider signals a rate limit.
    pub fn on_api_rate_limit_detected<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::ApiRateLimitDetected { wait_time, .. } = event {
                f(*wait_time);
            }
        }));
        self
    }

    /// Registers a callback invoked on every sliding-window update.
    pub fn on_token_usage_update<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::TokenUsageUpdate { current_tpm, .. } = event {
                f(*current_tpm);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever the concurrency target changes.
    pub fn on_concurrency_update<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::ConcurrencyUpdate { new_concurrency, .. } = event {
                f(*new_concurrency);
            }
        }));
        self
    }

    /// Builds the rate limiter, failing if `max_tpm` is non-positive.
    pub fn build(self) -> Result<crate::AdaptiveRateLimiter, ConfigError> {
        if self.max_tpm == 0 {
            return Err(ConfigError::NonPositiveMaxTpm { max_tpm: 0 });
        }
        let config = RateLimiterConfig {
            max_tpm: self.max_tpm,
            initial_concurrency: self.initial_concurrency,
            name: self.name,
            event_listeners: self.event_listeners,
        };
        Ok(crate::AdaptiveRateLimiter::new(config))
    }
}
