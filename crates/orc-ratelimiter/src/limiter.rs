use crate::capacity::{CapacityController, Retarget};
use crate::config::RateLimiterConfig;
use crate::events::RateLimiterEvent;
use crate::gate::ConcurrencyGate;
use crate::window::TokenWindow;
use orc_core::events::EventListeners;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::OwnedSemaphorePermit;

/// A held concurrency slot. Dropping it without going through
/// [`AdaptiveRateLimiter::record_request_completion`] still releases the
/// slot, but skips the sliding-window and capacity bookkeeping — callers
/// should always report completion explicitly.
pub struct RateLimitPermit(#[allow(dead_code)] OwnedSemaphorePermit);

struct Inner {
    name: String,
    window: Mutex<TokenWindow>,
    gate: ConcurrencyGate,
    capacity: CapacityController,
    event_listeners: EventListeners<RateLimiterEvent>,
}

/// Throttles concurrent access to a remote service under a tokens-per-minute
/// budget, re-tuning its own concurrency from observed request cost and
/// provider pushback.
///
/// Cheaply `Clone`-able; all clones share the same underlying state.
#[derive(Clone)]
pub struct AdaptiveRateLimiter {
    inner: Arc<Inner>,
}

impl AdaptiveRateLimiter {
    pub(crate) fn new(config: RateLimiterConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: config.name,
                window: Mutex::new(TokenWindow::new()),
                gate: ConcurrencyGate::new(config.initial_concurrency),
                capacity: CapacityController::new(config.max_tpm),
                event_listeners: config.event_listeners,
            }),
        }
    }

    pub fn builder() -> crate::config::RateLimiterConfigBuilder {
        crate::config::RateLimiterConfigBuilder::new()
    }

    pub fn current_concurrency(&self) -> usize {
        self.inner.gate.capacity()
    }

    pub fn current_tpm(&self) -> u64 {
        let mut window = self.inner.window.lock().unwrap();
        window.prune(Instant::now())
    }

    /// Suspends until a concurrency slot is available.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(action = "await_permission_to_proceed")))]
    pub async fn await_permission_to_proceed(&self) -> RateLimitPermit {
        let start = Instant::now();
        let permit = self.inner.gate.acquire().await;
        let waited = start.elapsed();

        {
            let mut window = self.inner.window.lock().unwrap();
            window.prune(Instant::now());
        }

        if waited > Duration::ZERO {
            self.inner.event_listeners.emit(&RateLimiterEvent::ProactivePause {
                name: self.inner.name.clone(),
                timestamp: Instant::now(),
                wait_time: waited,
            });
        }

        RateLimitPermit(permit)
    }

    /// Reports that a request finished. Releases the slot immediately; the
    /// sliding window and capacity retargeting happen synchronously here but
    /// never suspend.
    pub fn record_request_completion(&self, permit: RateLimitPermit, tokens_used: u64, success: bool) {
        drop(permit);

        if success && tokens_used > 0 {
            let now = Instant::now();
            let total = {
                let mut window = self.inner.window.lock().unwrap();
                window.record(now, tokens_used)
            };
            self.inner.event_listeners.emit(&RateLimiterEvent::TokenUsageUpdate {
                name: self.inner.name.clone(),
                timestamp: now,
                current_tpm: total,
            });
        }

        if success {
            if let Retarget::SetCapacity(target) = self.inner.capacity.on_completion(tokens_used) {
                self.apply_retarget(target);
            }
        }
    }

    /// Reports a provider-signaled rate limit. Halves capacity immediately,
    /// ignoring the heartbeat cooldown.
    pub fn record_api_rate_limit(&self, wait_time: Duration) {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            action = "record_api_rate_limit",
            name = %self.inner.name,
            wait_time = ?wait_time,
            "provider signaled a rate limit"
        );

        self.inner.event_listeners.emit(&RateLimiterEvent::ApiRateLimitDetected {
            name: self.inner.name.clone(),
            timestamp: Instant::now(),
            wait_time,
        });

        let current = self.inner.gate.capacity();
        if let Retarget::SetCapacity(target) = self.inner.capacity.on_pushback(current) {
            self.apply_retarget(target);
        }
    }

    fn apply_retarget(&self, target: usize) {
        let previous = self.inner.gate.capacity();
        self.inner.gate.resize_to(target);
        let new_concurrency = self.inner.gate.capacity();

        #[cfg(feature = "tracing")]
        tracing::info!(
            name = %self.inner.name,
            from = previous,
            to = new_concurrency,
            "concurrency retarget"
        );

        self.inner.event_listeners.emit(&RateLimiterEvent::ConcurrencyUpdate {
            name: self.inner.name.clone(),
            timestamp: Instant::now(),
            new_concurrency,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    #[tokio::test]
    async fn permission_is_granted_up_to_initial_concurrency() {
        let limiter = AdaptiveRateLimiter::builder()
            .max_tpm(60_000)
            .initial_concurrency(3)
            .build()
            .unwrap();

        let mut permits = Vec::new();
        for _ in 0..3 {
            let acquired =
                tokio::time::timeout(Duration::from_millis(50), limiter.await_permission_to_proceed())
                    .await;
            permits.push(acquired.expect("should not block under capacity"));
        }
        assert_eq!(limiter.current_concurrency(), 3);
    }

    #[tokio::test]
    async fn completion_updates_sliding_window() {
        let limiter = AdaptiveRateLimiter::builder()
            .max_tpm(60_000)
            .initial_concurrency(5)
            .build()
            .unwrap();

        let permit = limiter.await_permission_to_proceed().await;
        limiter.record_request_completion(permit, 1200, true);
        assert_eq!(limiter.current_tpm(), 1200);
    }

    #[tokio::test]
    async fn failed_completion_does_not_touch_window() {
        let limiter = AdaptiveRateLimiter::builder()
            .max_tpm(60_000)
            .initial_concurrency(5)
            .build()
            .unwrap();

        let permit = limiter.await_permission_to_proceed().await;
        limiter.record_request_completion(permit, 1200, false);
        assert_eq!(limiter.current_tpm(), 0);
    }

    #[tokio::test]
    async fn pushback_halves_concurrency_immediately() {
        let limiter = AdaptiveRateLimiter::builder()
            .max_tpm(60_000)
            .initial_concurrency(20)
            .build()
            .unwrap();

        limiter.record_api_rate_limit(Duration::from_secs(2));
        assert_eq!(limiter.current_concurrency(), 10);
    }

    #[tokio::test]
    async fn concurrency_update_event_fires_on_pushback() {
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let seen_clone = Arc::clone(&seen);

        let limiter = AdaptiveRateLimiter::builder()
            .max_tpm(60_000)
            .initial_concurrency(20)
            .on_concurrency_update(move |c| seen_clone.store(c, Ordering::SeqCst))
            .build()
            .unwrap();

        limiter.record_api_rate_limit(Duration::from_secs(1));
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn heartbeat_retarget_tunes_concurrency_to_the_utilization_target() {
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let seen_clone = Arc::clone(&seen);

        let limiter = AdaptiveRateLimiter::builder()
            .max_tpm(60_000)
            .initial_concurrency(5)
            .on_concurrency_update(move |c| seen_clone.store(c, Ordering::SeqCst))
            .build()
            .unwrap();

        // 20 completions with no token usage keep the controller's average
        // cost at its default (1500), so the heartbeat retargets to
        // 0.9 * 60_000 / 1500 = 36.
        for _ in 0..20 {
            let permit = limiter.await_permission_to_proceed().await;
            limiter.record_request_completion(permit, 0, true);
        }

        assert_eq!(limiter.current_concurrency(), 36);
        assert_eq!(seen.load(Ordering::SeqCst), 36);
    }

    #[tokio::test]
    async fn token_usage_update_event_reports_running_total() {
        let total = Arc::new(AtomicU64::new(0));
        let total_clone = Arc::clone(&total);

        let limiter = AdaptiveRateLimiter::builder()
            .max_tpm(60_000)
            .initial_concurrency(5)
            .on_token_usage_update(move |tpm| total_clone.store(tpm, Ordering::SeqCst))
            .build()
            .unwrap();

        let permit = limiter.await_permission_to_proceed().await;
        limiter.record_request_completion(permit, 500, true);
        assert_eq!(total.load(Ordering::SeqCst), 500);
    }
}
