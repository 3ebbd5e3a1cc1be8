//! Self-tuning capacity controller.
//!
//! Re-evaluates the target concurrency every `HEARTBEAT_REQUESTS` completions
//! (subject to a cooldown) from the observed average request cost, and halves
//! capacity unconditionally the moment the provider signals a rate limit.

use crate::gate::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const HEARTBEAT_REQUESTS: usize = 20;
const ADJUSTMENT_COOLDOWN: Duration = Duration::from_secs(5);
const COST_HISTORY: usize = 50;
const DEFAULT_REQUEST_COST: u64 = 1500;
const TARGET_UTILIZATION: f64 = 0.90;

/// Tracks recent per-request token cost and decides when/how to retarget
/// the concurrency gate.
pub(crate) struct CapacityController {
    max_tpm: u64,
    recent_costs: Mutex<VecDeque<u64>>,
    cost_sum: AtomicUsize,
    reqs_since_adjustment: AtomicUsize,
    last_adjustment: Mutex<Instant>,
    is_adjusting: AtomicBool,
}

/// What the caller should do as a result of a completion/pushback signal.
pub(crate) enum Retarget {
    None,
    SetCapacity(usize),
}

impl CapacityController {
    pub(crate) fn new(max_tpm: u64) -> Self {
        Self {
            max_tpm,
            recent_costs: Mutex::new(VecDeque::with_capacity(COST_HISTORY)),
            cost_sum: AtomicUsize::new(0),
            reqs_since_adjustment: AtomicUsize::new(0),
            last_adjustment: Mutex::new(Instant::now()),
            is_adjusting: AtomicBool::new(false),
        }
    }

    fn avg_request_cost(&self) -> u64 {
        let costs = self.recent_costs.lock().unwrap();
        if costs.is_empty() {
            return DEFAULT_REQUEST_COST;
        }
        (self.cost_sum.load(Ordering::Relaxed) / costs.len()) as u64
    }

    fn record_cost(&self, tokens: u64) {
        let mut costs = self.recent_costs.lock().unwrap();
        costs.push_back(tokens);
        self.cost_sum.fetch_add(tokens as usize, Ordering::Relaxed);
        if costs.len() > COST_HISTORY {
            if let Some(evicted) = costs.pop_front() {
                self.cost_sum.fetch_sub(evicted as usize, Ordering::Relaxed);
            }
        }
    }

    fn ideal_capacity(&self) -> usize {
        let avg_cost = self.avg_request_cost().max(1);
        let ideal = ((TARGET_UTILIZATION * self.max_tpm as f64) / avg_cost as f64).floor();
        (ideal as i64).clamp(MIN_CONCURRENCY as i64, MAX_CONCURRENCY as i64) as usize
    }

    /// Call on every successful completion that reports real token usage.
    /// Returns a new target capacity once per `HEARTBEAT_REQUESTS`
    /// completions, provided the cooldown has elapsed.
    pub(crate) fn on_completion(&self, tokens: u64) -> Retarget {
        if tokens > 0 {
            self.record_cost(tokens);
        }

        let count = self.reqs_since_adjustment.fetch_add(1, Ordering::SeqCst) + 1;
        if count < HEARTBEAT_REQUESTS {
            return Retarget::None;
        }

        if self
            .is_adjusting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Retarget::None;
        }

        let elapsed_ok = {
            let last = self.last_adjustment.lock().unwrap();
            last.elapsed() >= ADJUSTMENT_COOLDOWN
        };

        if !elapsed_ok {
            self.is_adjusting.store(false, Ordering::SeqCst);
            return Retarget::None;
        }

        self.reqs_since_adjustment.store(0, Ordering::SeqCst);
        *self.last_adjustment.lock().unwrap() = Instant::now();
        let target = self.ideal_capacity();
        self.is_adjusting.store(false, Ordering::SeqCst);
        Retarget::SetCapacity(target)
    }

    /// Call when the provider signals a rate limit. Ignores cooldown and
    /// resets the heartbeat counter so a pushback doesn't immediately get
    /// overridden by a stale heartbeat decision.
    pub(crate) fn on_pushback(&self, current_capacity: usize) -> Retarget {
        self.reqs_since_adjustment.store(0, Ordering::SeqCst);
        *self.last_adjustment.lock().unwrap() = Instant::now();
        let halved = (current_capacity / 2).max(MIN_CONCURRENCY);
        Retarget::SetCapacity(halved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cost_used_when_no_samples() {
        let controller = CapacityController::new(100_000);
        assert_eq!(controller.avg_request_cost(), DEFAULT_REQUEST_COST);
    }

    #[test]
    fn ideal_capacity_respects_bounds() {
        let controller = CapacityController::new(10);
        // tiny max_tpm with default cost -> floor at MIN_CONCURRENCY
        assert_eq!(controller.ideal_capacity(), MIN_CONCURRENCY);

        let controller = CapacityController::new(100_000_000);
        controller.record_cost(1);
        assert_eq!(controller.ideal_capacity(), MAX_CONCURRENCY);
    }

    #[test]
    fn heartbeat_fires_only_every_twenty_completions() {
        let controller = CapacityController::new(60_000);
        for _ in 0..HEARTBEAT_REQUESTS - 1 {
            assert!(matches!(controller.on_completion(1000), Retarget::None));
        }
        assert!(matches!(
            controller.on_completion(1000),
            Retarget::SetCapacity(_)
        ));
    }

    #[test]
    fn heartbeat_respects_cooldown() {
        let controller = CapacityController::new(60_000);
        for _ in 0..HEARTBEAT_REQUESTS {
            controller.on_completion(1000);
        }
        for _ in 0..HEARTBEAT_REQUESTS {
            assert!(matches!(controller.on_completion(1000), Retarget::None));
        }
    }

    #[test]
    fn pushback_halves_capacity_ignoring_cooldown() {
        let controller = CapacityController::new(60_000);
        match controller.on_pushback(20) {
            Retarget::SetCapacity(c) => assert_eq!(c, 10),
            Retarget::None => panic!("expected a retarget"),
        }
    }

    #[test]
    fn heartbeat_target_matches_target_utilization_formula() {
        // max_tpm=60_000, default cost 1500 (no real usage samples fed in
        // since every completion here reports 0 tokens): 0.9 * 60_000 / 1500 = 36.
        let controller = CapacityController::new(60_000);
        for _ in 0..HEARTBEAT_REQUESTS - 1 {
            assert!(matches!(controller.on_completion(0), Retarget::None));
        }
        match controller.on_completion(0) {
            Retarget::SetCapacity(target) => assert_eq!(target, 36),
            Retarget::None => panic!("expected a retarget"),
        }
    }

    #[test]
    fn pushback_never_drops_below_min_concurrency() {
        let controller = CapacityController::new(60_000);
        match controller.on_pushback(2) {
            Retarget::SetCapacity(c) => assert_eq!(c, MIN_CONCURRENCY),
            Retarget::None => panic!("expected a retarget"),
        }
    }
}
