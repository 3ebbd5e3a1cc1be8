use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Value aggregate for one scope (global or a single batch).
///
/// All mutation is expected to go through [`crate::StatsManager`], which
/// serializes it behind one lock; this type itself does no locking.
#[derive(Debug, Clone)]
pub struct StatsContainer {
    start_instant: Instant,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,

    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub error_type_counts: HashMap<String, u64>,

    pub current_concurrent_requests: u64,
    pub concurrent_peak: u64,

    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub total_cost: f64,
    pub retry_count: u64,

    pub api_response_times: Vec<f64>,

    pub peak_tpm: u64,
    pub proactive_pause_count: u64,
    pub proactive_pause_wait_seconds: f64,
    pub api_rate_limit_count: u64,
}

impl StatsContainer {
    pub fn new() -> Self {
        Self {
            start_instant: Instant::now(),
            start_time: Utc::now(),
            end_time: None,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            error_type_counts: HashMap::new(),
            current_concurrent_requests: 0,
            concurrent_peak: 0,
            input_tokens: 0,
            output_tokens: 0,
            cached_tokens: 0,
            total_cost: 0.0,
            retry_count: 0,
            api_response_times: Vec::new(),
            peak_tpm: 0,
            proactive_pause_count: 0,
            proactive_pause_wait_seconds: 0.0,
            api_rate_limit_count: 0,
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Sets `end_time` once. Later calls are ignored; `end_time` is immutable
    /// after the first close.
    pub fn close(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Utc::now());
        }
    }

    pub fn record_success(
        &mut self,
        input_tokens: u64,
        output_tokens: u64,
        cached_tokens: u64,
        cost: f64,
        api_response_time: f64,
        attempts: u64,
    ) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.input_tokens += input_tokens;
        self.output_tokens += output_tokens;
        self.cached_tokens += cached_tokens;
        self.total_cost += cost;
        if api_response_time > 0.0 {
            self.api_response_times.push(api_response_time);
        }
        self.retry_count += attempts.saturating_sub(1);
    }

    pub fn record_failure(&mut self, error_type: Option<&str>, api_response_time: f64, attempts: u64) {
        self.total_requests += 1;
        self.failed_requests += 1;
        let key = error_type.unwrap_or("UnknownError").to_string();
        *self.error_type_counts.entry(key).or_insert(0) += 1;
        if api_response_time > 0.0 {
            self.api_response_times.push(api_response_time);
        }
        self.retry_count += attempts.saturating_sub(1);
    }

    pub fn record_concurrent_start(&mut self) {
        self.current_concurrent_requests += 1;
        self.concurrent_peak = self.concurrent_peak.max(self.current_concurrent_requests);
    }

    pub fn record_concurrent_end(&mut self) {
        self.current_concurrent_requests = self.current_concurrent_requests.saturating_sub(1);
    }

    pub fn record_proactive_pause(&mut self, wait_time: Duration) {
        self.proactive_pause_count += 1;
        self.proactive_pause_wait_seconds += wait_time.as_secs_f64();
    }

    pub fn record_api_rate_limit(&mut self) {
        self.api_rate_limit_count += 1;
    }

    pub fn observe_tpm(&mut self, current_tpm: u64) {
        self.peak_tpm = self.peak_tpm.max(current_tpm);
    }

    pub fn processing_time(&self) -> Duration {
        match self.end_time {
            Some(_) => self.start_instant.elapsed(),
            None => self.start_instant.elapsed(),
        }
    }

    pub fn total_api_time(&self) -> f64 {
        self.api_response_times.iter().sum()
    }

    /// May be negative for trivially small batches; reported as computed.
    pub fn parallelization_gain_seconds(&self) -> f64 {
        self.total_api_time() - self.processing_time().as_secs_f64()
    }

    pub fn parallelization_gain_percent(&self) -> f64 {
        let total = self.total_api_time();
        if total > 0.0 {
            100.0 * self.parallelization_gain_seconds() / total
        } else {
            0.0
        }
    }

    pub fn requests_per_second(&self) -> f64 {
        let elapsed = self.processing_time().as_secs_f64();
        if elapsed > 0.0 {
            self.total_requests as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn min_api_response_time(&self) -> Option<f64> {
        self.api_response_times
            .iter()
            .cloned()
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
    }

    pub fn max_api_response_time(&self) -> Option<f64> {
        self.api_response_times
            .iter()
            .cloned()
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    pub fn mean_api_response_time(&self) -> Option<f64> {
        if self.api_response_times.is_empty() {
            None
        } else {
            Some(self.total_api_time() / self.api_response_times.len() as f64)
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl Default for StatsContainer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_requests_equals_success_plus_failure() {
        let mut c = StatsContainer::new();
        c.record_success(100, 50, 0, 0.01, 0.5, 1);
        c.record_failure(Some("Boom"), 0.2, 3);
        assert_eq!(c.total_requests, 2);
        assert_eq!(c.successful_requests + c.failed_requests, c.total_requests);
    }

    #[test]
    fn error_type_counts_sum_to_failed_requests() {
        let mut c = StatsContainer::new();
        c.record_failure(Some("Timeout"), 0.1, 1);
        c.record_failure(Some("Timeout"), 0.1, 1);
        c.record_failure(None, 0.1, 1);
        let sum: u64 = c.error_type_counts.values().sum();
        assert_eq!(sum, c.failed_requests);
        assert_eq!(c.error_type_counts.get("UnknownError"), Some(&1));
        assert_eq!(c.error_type_counts.get("Timeout"), Some(&2));
    }

    #[test]
    fn concurrent_peak_tracks_the_high_watermark() {
        let mut c = StatsContainer::new();
        c.record_concurrent_start();
        c.record_concurrent_start();
        c.record_concurrent_start();
        c.record_concurrent_end();
        assert_eq!(c.concurrent_peak, 3);
        assert_eq!(c.current_concurrent_requests, 2);
    }

    #[test]
    fn peak_tpm_is_monotone() {
        let mut c = StatsContainer::new();
        c.observe_tpm(500);
        c.observe_tpm(2000);
        c.observe_tpm(800);
        assert_eq!(c.peak_tpm, 2000);
    }

    #[test]
    fn close_is_idempotent() {
        let mut c = StatsContainer::new();
        c.close();
        let first = c.end_time();
        c.close();
        assert_eq!(c.end_time(), first);
    }

    #[test]
    fn retry_count_never_counts_the_first_attempt() {
        let mut c = StatsContainer::new();
        c.record_success(10, 10, 0, 0.0, 0.1, 1);
        assert_eq!(c.retry_count, 0);
        c.record_success(10, 10, 0, 0.0, 0.1, 3);
        assert_eq!(c.retry_count, 2);
    }
}
