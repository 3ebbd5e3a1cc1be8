use orc_core::events::TelemetryEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`crate::RetryPolicy`].
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed and another is about to be made.
    Retry {
        name: String,
        timestamp: Instant,
        next_attempt: usize,
        delay: Duration,
    },
    /// The operation succeeded, possibly after retries.
    Success {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The operation failed after exhausting all attempts.
    Exhausted {
        name: String,
        timestamp: Instant,
        attempts: usize,
    },
}

impl TelemetryEvent for RetryEvent {
    fn kind(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            RetryEvent::Retry { name, .. }
            | RetryEvent::Success { name, .. }
            | RetryEvent::Exhausted { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let now = Instant::now();
        let retry = RetryEvent::Retry {
            name: "test".into(),
            timestamp: now,
            next_attempt: 2,
            delay: Duration::from_secs(1),
        };
        assert_eq!(retry.kind(), "retry");

        let success = RetryEvent::Success {
            name: "test".into(),
            timestamp: now,
            attempts: 1,
        };
        assert_eq!(success.kind(), "success");

        let exhausted = RetryEvent::Exhausted {
            name: "test".into(),
            timestamp: now,
            attempts: 3,
        };
        assert_eq!(exhausted.kind(), "exhausted");
    }

    #[test]
    fn source_name_is_threaded_through() {
        let event = RetryEvent::Success {
            name: "my-client".into(),
            timestamp: Instant::now(),
            attempts: 1,
        };
        assert_eq!(event.source_name(), "my-client");
    }
}
