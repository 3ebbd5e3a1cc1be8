use crate::events::RetryEvent;
use orc_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`crate::RetryPolicy`].
pub struct RetryConfig {
    pub(crate) max_attempts: usize,
    pub(crate) wait: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    max_attempts: usize,
    wait: Duration,
    name: String,
    event_listeners: EventListeners<RetryEvent>,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults: `max_attempts: 3`, `wait: 1s`, `name: "<unnamed>"`.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            wait: Duration::from_secs(1),
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the total number of attempts (the first try plus retries).
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the fixed wait between attempts.
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Sets the name used to tag emitted events.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each retried attempt.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry {
                next_attempt, delay, ..
            } = event
            {
                f(*next_attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when an attempt finally succeeds.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when all attempts are exhausted.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the retry policy.
    pub fn build(self) -> crate::RetryPolicy {
        crate::RetryPolicy::new(RetryConfig {
            max_attempts: self.max_attempts,
            wait: self.wait,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}
