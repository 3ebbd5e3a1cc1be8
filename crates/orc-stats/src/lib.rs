//! Pricing, statistics aggregation, and batch progress tracking.
//!
//! - [`pricing`] — immutable `model -> unit price` lookup and the cost formula.
//! - [`container`] — per-scope (global or batch) counters and derived measures.
//! - [`manager`] — owns the global container plus a `batch_id -> container`
//!   map, serializing all mutation through one lock.
//! - [`progress`] — per-batch 10%-milestone progress logging.
//! - [`outcome`] — the result of one request, in fixed field order.

mod container;
mod manager;
mod outcome;
mod pricing;
mod progress;

pub use container::StatsContainer;
pub use manager::{RateLimiterEventKind, RequestRecord, StatsManager};
pub use outcome::{ErrorDetails, ParsedContent, RequestOutcome};
pub use pricing::{ModelPricing, PricingTable, PricingTableBuilder};
pub use progress::{Milestone, ProgressTracker};
