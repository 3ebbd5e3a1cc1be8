//! Adaptive, token-budget-aware rate limiting.
//!
//! [`AdaptiveRateLimiter`] combines three pieces:
//!
//! - a 60-second sliding log of observed token usage ([`window`]),
//! - a variable-capacity concurrency gate that never revokes a live permit
//!   when shrinking ([`gate`]),
//! - a self-tuning controller that retargets the gate from average request
//!   cost on a heartbeat, and halves it immediately on provider pushback
//!   ([`capacity`]).
//!
//! # Example
//!
//! ```
//! use orc_ratelimiter::AdaptiveRateLimiter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = AdaptiveRateLimiter::builder()
//!     .max_tpm(60_000)
//!     .initial_concurrency(10)
//!     .name("primary")
//!     .build()?;
//!
//! let permit = limiter.await_permission_to_proceed().await;
//! // ... call the remote service, observe `tokens_used` ...
//! limiter.record_request_completion(permit, 1800, true);
//! # Ok(())
//! # }
//! ```

mod capacity;
mod config;
mod events;
mod gate;
mod limiter;
mod window;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use events::RateLimiterEvent;
pub use limiter::{AdaptiveRateLimiter, RateLimitPermit};
