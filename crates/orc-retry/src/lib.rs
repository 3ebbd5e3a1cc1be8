//! A fixed-attempt retry loop with per-attempt telemetry.
//!
//! [`RetryPolicy`] retries a fallible async closure a fixed number of times
//! with a fixed wait in between. It does not classify errors: every failure
//! is retried the same way, up to `max_attempts`. Callers that need
//! different handling for a particular failure (for instance, notifying a
//! rate limiter before the next attempt) observe that inside the closure
//! passed to [`RetryPolicy::execute`], since it is re-invoked once per
//! attempt.
//!
//! # Example
//!
//! ```
//! use orc_retry::RetryPolicy;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = RetryPolicy::builder()
//!     .max_attempts(3)
//!     .wait(Duration::from_millis(1))
//!     .name("summarize")
//!     .build();
//!
//! let result: Result<u32, &str> = policy
//!     .execute(|_attempt| async { Ok(7) })
//!     .await;
//! assert_eq!(result.unwrap(), 7);
//! # }
//! ```

mod config;
mod events;
mod retry;

pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use retry::{RetryError, RetryPolicy};
