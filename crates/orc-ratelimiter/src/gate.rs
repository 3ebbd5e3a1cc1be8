//! Variable-capacity concurrency gate.
//!
//! A [`tokio::sync::Semaphore`] is constructed at the hard maximum capacity.
//! Shrinking the effective capacity never revokes a permit already granted
//! to a live caller: instead a background task acquires and holds a permit
//! ("ghost-acquire") until capacity grows back far enough to need it. This
//! keeps the gate deadlock-free under arbitrarily fast oscillation between
//! growing and shrinking.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub(crate) const MIN_CONCURRENCY: usize = 2;
pub(crate) const MAX_CONCURRENCY: usize = 100;

struct Shared {
    semaphore: Arc<Semaphore>,
    capacity: AtomicUsize,
    /// How many ghost permits we currently want withheld from circulation.
    desired_ghosts: AtomicUsize,
    held_ghosts: std::sync::Mutex<Vec<OwnedSemaphorePermit>>,
}

/// Gates callers on a logical concurrency limit that can shrink and grow at
/// runtime without ever canceling work already admitted.
#[derive(Clone)]
pub(crate) struct ConcurrencyGate {
    shared: Arc<Shared>,
}

impl ConcurrencyGate {
    pub(crate) fn new(initial_capacity: usize) -> Self {
        let initial_capacity = initial_capacity.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENCY));
        let shared = Arc::new(Shared {
            semaphore,
            capacity: AtomicUsize::new(initial_capacity),
            desired_ghosts: AtomicUsize::new(MAX_CONCURRENCY - initial_capacity),
            held_ghosts: std::sync::Mutex::new(Vec::new()),
        });
        let gate = Self { shared };
        gate.spawn_ghosts(MAX_CONCURRENCY - initial_capacity);
        gate
    }

    /// Acquires one slot, suspending until one is available.
    pub(crate) async fn acquire(&self) -> OwnedSemaphorePermit {
        self.shared
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("gate semaphore is never closed")
    }

    pub(crate) fn capacity(&self) -> usize {
        self.shared.capacity.load(Ordering::Relaxed)
    }

    /// Adjusts the effective capacity to `new_capacity`, clamped to the
    /// gate's hard bounds.
    pub(crate) fn resize_to(&self, new_capacity: usize) {
        let new_capacity = new_capacity.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        let old_capacity = self.shared.capacity.swap(new_capacity, Ordering::SeqCst);

        if new_capacity > old_capacity {
            let grow_by = new_capacity - old_capacity;
            self.shared
                .desired_ghosts
                .fetch_sub(grow_by, Ordering::SeqCst);
            let mut held = self.shared.held_ghosts.lock().unwrap();
            let release_from_held = grow_by.min(held.len());
            let new_len = held.len() - release_from_held;
            held.truncate(new_len);
            // Any shortfall is covered lazily: ghost tasks still in flight
            // for the old target self-release on completion (see spawn_ghosts).
        } else if new_capacity < old_capacity {
            let shrink_by = old_capacity - new_capacity;
            self.shared
                .desired_ghosts
                .fetch_add(shrink_by, Ordering::SeqCst);
            self.spawn_ghosts(shrink_by);
        }
    }

    fn spawn_ghosts(&self, count: usize) {
        for _ in 0..count {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                let permit = shared
                    .semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("gate semaphore is never closed");

                // Capacity may have grown back past this ghost's purpose
                // while it was waiting for a live caller to release a
                // permit; if so, hand the permit straight back instead of
                // withholding it forever.
                let mut held = shared.held_ghosts.lock().unwrap();
                if held.len() < shared.desired_ghosts.load(Ordering::SeqCst) {
                    held.push(permit);
                }
                // else: `permit` drops here, releasing it immediately.
            });
        }
    }
}
