use crate::container::StatsContainer;
use crate::pricing::PricingTable;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// The subset of rate-limiter telemetry the stats manager folds into its
/// containers. Kept independent of the rate limiter crate's event type so
/// this crate has no dependency on it; the orchestrator translates.
#[derive(Debug, Clone, Copy)]
pub enum RateLimiterEventKind {
    ProactivePause { wait_time: Duration },
    ApiRateLimitDetected,
    TokenUsageUpdate { current_tpm: u64 },
}

/// Inputs needed to fold one completed attempt into a container.
pub struct RequestRecord<'a> {
    pub model: &'a str,
    pub success: bool,
    pub error_type: Option<&'a str>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub api_response_time: f64,
    pub attempts: u32,
}

struct State {
    global: StatsContainer,
    batches: HashMap<String, StatsContainer>,
}

/// Owns the global container and a `batch_id -> container` map, serializing
/// all mutation through one lock.
pub struct StatsManager {
    pricing: PricingTable,
    state: Mutex<State>,
}

impl StatsManager {
    pub fn new(pricing: PricingTable) -> Self {
        Self {
            pricing,
            state: Mutex::new(State {
                global: StatsContainer::new(),
                batches: HashMap::new(),
            }),
        }
    }

    /// Creates and registers a batch container. If `id` already exists
    /// (two batches mangled to the same id within the same second), it is
    /// overwritten and a warning is logged.
    pub fn start_batch(&self, id: impl Into<String>) {
        let id = id.into();
        let mut state = self.state.lock().unwrap();
        if state.batches.contains_key(&id) {
            #[cfg(feature = "tracing")]
            tracing::warn!(batch_id = %id, "batch id collision, overwriting existing container");
        }
        state.batches.insert(id, StatsContainer::new());
    }

    /// Closes a batch container and mirrors its close to the global
    /// container's `end_time`. Returns `None` for an unknown id or one
    /// that is already closed (a second `end_batch` call is a no-op).
    pub fn end_batch(&self, id: &str) -> Option<StatsContainer> {
        let mut state = self.state.lock().unwrap();
        let container = state.batches.get_mut(id)?;
        if container.is_closed() {
            return None;
        }
        container.close();
        state.global.close();
        state.batches.get(id).cloned()
    }

    pub fn record_request(&self, batch_id: Option<&str>, record: RequestRecord<'_>) {
        let cost = if record.success {
            self.pricing.cost(
                record.model,
                record.input_tokens,
                record.output_tokens,
                record.cached_tokens,
            )
        } else {
            0.0
        };

        let mut state = self.state.lock().unwrap();
        Self::apply(&mut state.global, &record, cost);
        if let Some(id) = batch_id {
            if let Some(container) = state.batches.get_mut(id) {
                Self::apply(container, &record, cost);
            }
        }
    }

    fn apply(container: &mut StatsContainer, record: &RequestRecord<'_>, cost: f64) {
        if record.success {
            container.record_success(
                record.input_tokens,
                record.output_tokens,
                record.cached_tokens,
                cost,
                record.api_response_time,
                record.attempts as u64,
            );
        } else {
            container.record_failure(record.error_type, record.api_response_time, record.attempts as u64);
        }
    }

    pub fn record_concurrent_start(&self, batch_id: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.global.record_concurrent_start();
        if let Some(id) = batch_id {
            if let Some(c) = state.batches.get_mut(id) {
                c.record_concurrent_start();
            }
        }
    }

    pub fn record_concurrent_end(&self, batch_id: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.global.record_concurrent_end();
        if let Some(id) = batch_id {
            if let Some(c) = state.batches.get_mut(id) {
                c.record_concurrent_end();
            }
        }
    }

    pub fn record_rate_limiter_event(&self, event: RateLimiterEventKind, batch_id: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        Self::apply_event(&mut state.global, event);
        if let Some(id) = batch_id {
            if let Some(c) = state.batches.get_mut(id) {
                Self::apply_event(c, event);
            }
        }
    }

    fn apply_event(container: &mut StatsContainer, event: RateLimiterEventKind) {
        match event {
            RateLimiterEventKind::ProactivePause { wait_time } => {
                container.record_proactive_pause(wait_time)
            }
            RateLimiterEventKind::ApiRateLimitDetected => container.record_api_rate_limit(),
            RateLimiterEventKind::TokenUsageUpdate { current_tpm } => container.observe_tpm(current_tpm),
        }
    }

    /// A snapshot of the global container.
    pub fn get_global_stats(&self) -> StatsContainer {
        self.state.lock().unwrap().global.clone()
    }

    pub fn get_batch_stats(&self, batch_id: &str) -> Option<StatsContainer> {
        self.state.lock().unwrap().batches.get(batch_id).cloned()
    }

    /// A formatted multi-line report. An unknown batch id yields a visible
    /// error string rather than panicking.
    pub fn get_summary(&self, batch_id: Option<&str>) -> String {
        let state = self.state.lock().unwrap();
        let container = match batch_id {
            None => &state.global,
            Some(id) => match state.batches.get(id) {
                Some(c) => c,
                None => return format!("no such batch: {id}"),
            },
        };
        format_summary(batch_id, container)
    }
}

fn format_summary(batch_id: Option<&str>, c: &StatsContainer) -> String {
    const TZ_OFFSET_SECONDS: i32 = -3 * 3600;
    let tz = chrono::FixedOffset::east_opt(TZ_OFFSET_SECONDS).unwrap();
    let start = c.start_time().with_timezone(&tz).format("%Y-%m-%d %H:%M:%S");
    let end = c
        .end_time()
        .map(|t| t.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "in progress".to_string());

    let label = batch_id.unwrap_or("<global>");
    format!(
        "batch={label} start={start} end={end} requests={total} success={ok} failed={fail} \
cost={cost:.4} tokens={tokens} concurrent_peak={peak} peak_tpm={tpm} rps={rps:.2} \
parallelization_gain_pct={gain:.1}",
        label = label,
        start = start,
        end = end,
        total = c.total_requests,
        ok = c.successful_requests,
        fail = c.failed_requests,
        cost = c.total_cost,
        tokens = c.total_tokens(),
        peak = c.concurrent_peak,
        tpm = c.peak_tpm,
        rps = c.requests_per_second(),
        gain = c.parallelization_gain_percent(),
    )
}
