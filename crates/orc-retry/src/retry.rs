use crate::config::{RetryConfig, RetryConfigBuilder};
use crate::events::RetryEvent;
use orc_core::events::EventListeners;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// The last error observed after a [`RetryPolicy`] exhausted its attempts.
#[derive(Debug)]
pub struct RetryError<E> {
    pub last_error: E,
    pub attempts: usize,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempt(s): {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Retries a fallible async operation a fixed number of times with a fixed
/// wait between attempts.
///
/// Every error is treated the same: `RetryPolicy` does not inspect or
/// classify failures, it only counts them. Callers that need to react to a
/// specific failure kind (for example, to notify a rate limiter before the
/// next attempt) do so from inside the closure passed to [`execute`], between
/// one attempt and the next.
///
/// [`execute`]: RetryPolicy::execute
pub struct RetryPolicy {
    max_attempts: usize,
    wait: Duration,
    name: String,
    event_listeners: EventListeners<RetryEvent>,
}

impl RetryPolicy {
    pub(crate) fn new(config: RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            wait: config.wait,
            name: config.name,
            event_listeners: config.event_listeners,
        }
    }

    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Runs `attempt` up to `max_attempts` times, waiting `wait` between
    /// failures. `attempt` is called again from attempt 2 onward with the
    /// 1-based attempt number it is about to make.
    pub async fn execute<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut last_error = None;
        for n in 1..=self.max_attempts {
            match attempt(n).await {
                Ok(value) => {
                    if n > 1 {
                        self.event_listeners.emit(&RetryEvent::Success {
                            name: self.name.clone(),
                            timestamp: Instant::now(),
                            attempts: n,
                        });
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if n < self.max_attempts {
                        self.event_listeners.emit(&RetryEvent::Retry {
                            name: self.name.clone(),
                            timestamp: Instant::now(),
                            next_attempt: n + 1,
                            delay: self.wait,
                        });
                        sleep(self.wait).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        let last_error = last_error.expect("loop runs at least once");
        self.event_listeners.emit(&RetryEvent::Exhausted {
            name: self.name.clone(),
            timestamp: Instant::now(),
            attempts: self.max_attempts,
        });
        Err(RetryError {
            last_error,
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_without_retrying_on_first_try() {
        let policy = RetryPolicy::builder().max_attempts(3).build();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let result: Result<u32, RetryError<&str>> = policy
            .execute(|_attempt| {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_max_attempts_then_gives_up() {
        let policy = RetryPolicy::builder()
            .max_attempts(3)
            .wait(Duration::from_millis(1))
            .build();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let result: Result<u32, RetryError<&str>> = policy
            .execute(|_attempt| {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("boom")
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error, "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn succeeds_after_a_transient_failure() {
        let policy = RetryPolicy::builder()
            .max_attempts(3)
            .wait(Duration::from_millis(1))
            .build();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let result: Result<u32, RetryError<&str>> = policy
            .execute(|attempt| {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err("not yet")
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn success_event_fires_only_after_a_retry() {
        let successes = Arc::new(AtomicUsize::new(0));
        let successes_clone = Arc::clone(&successes);
        let policy = RetryPolicy::builder()
            .max_attempts(3)
            .wait(Duration::from_millis(1))
            .on_success(move |_attempts| {
                successes_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let _: Result<u32, RetryError<&str>> = policy.execute(|_attempt| async { Ok(1) }).await;
        assert_eq!(successes.load(Ordering::SeqCst), 0);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let _: Result<u32, RetryError<&str>> = policy
            .execute(|attempt| {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err("not yet")
                    } else {
                        Ok(1)
                    }
                }
            })
            .await;
        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }
}
