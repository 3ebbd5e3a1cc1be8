use std::sync::Mutex;
use std::time::{Duration, Instant};

const MILESTONES: [u32; 10] = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];

struct State {
    completed: u64,
    logged_milestones: Vec<u32>,
}

/// Per-batch progress counter that logs once at each 10% milestone, with
/// observed rate and ETA derived from elapsed wall time.
pub struct ProgressTracker {
    total: u64,
    start_time: Instant,
    state: Mutex<State>,
}

/// A milestone crossed by one `increment_and_log` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Milestone {
    pub percent: u32,
    pub completed: u64,
    pub total: u64,
    pub elapsed: Duration,
    pub rate_per_second: f64,
    pub eta: Option<Duration>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            start_time: Instant::now(),
            state: Mutex::new(State {
                completed: 0,
                logged_milestones: Vec::new(),
            }),
        }
    }

    /// Increments the completed count and returns a [`Milestone`] exactly
    /// once per crossed 10% boundary, `None` otherwise.
    pub fn increment_and_log(&self) -> Option<Milestone> {
        if self.total == 0 {
            return None;
        }
        let mut state = self.state.lock().unwrap();
        state.completed += 1;

        let progress_pct = (state.completed as f64 / self.total as f64) * 100.0;
        let current_milestone = ((progress_pct / 10.0).floor() as u32) * 10;
        let reachable = MILESTONES
            .iter()
            .copied()
            .filter(|m| *m <= current_milestone && *m > 0)
            .max();

        let milestone = reachable?;
        if state.logged_milestones.contains(&milestone) {
            return None;
        }
        state.logged_milestones.push(milestone);

        let elapsed = self.start_time.elapsed();
        let rate = if elapsed.as_secs_f64() > 0.0 {
            state.completed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let remaining = self.total.saturating_sub(state.completed);
        let eta = if rate > 0.0 {
            Some(Duration::from_secs_f64(remaining as f64 / rate))
        } else {
            None
        };

        Some(Milestone {
            percent: milestone,
            completed: state.completed,
            total: self.total,
            elapsed,
            rate_per_second: rate,
            eta,
        })
    }

    pub fn completed(&self) -> u64 {
        self.state.lock().unwrap().completed
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
