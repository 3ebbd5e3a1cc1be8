//! Sixty-second sliding log of token usage.
//!
//! Grounded on the same front-pruning `VecDeque` technique used for
//! request-count sliding windows elsewhere in this codebase, but each
//! entry carries a token weight instead of counting for one.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Tracks token usage over the trailing 60 seconds.
#[derive(Debug, Default)]
pub(crate) struct TokenWindow {
    entries: VecDeque<(Instant, u64)>,
    tokens_in_window: u64,
}

impl TokenWindow {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            tokens_in_window: 0,
        }
    }

    /// Drops entries older than the window and returns the current total.
    pub(crate) fn prune(&mut self, now: Instant) -> u64 {
        while let Some(&(timestamp, tokens)) = self.entries.front() {
            if now.duration_since(timestamp) >= WINDOW {
                self.entries.pop_front();
                self.tokens_in_window -= tokens;
            } else {
                break;
            }
        }
        self.tokens_in_window
    }

    /// Records a usage sample and returns the post-insert total (after pruning).
    pub(crate) fn record(&mut self, now: Instant, tokens: u64) -> u64 {
        self.prune(now);
        if tokens > 0 {
            self.entries.push_back((now, tokens));
            self.tokens_in_window += tokens;
        }
        self.tokens_in_window
    }

    pub(crate) fn current_tpm(&self) -> u64 {
        self.tokens_in_window
    }
}
