//! Telemetry event plumbing shared by the rate limiter and retry crates.
//!
//! Both `orc_ratelimiter::RateLimiterEvent` and `orc_retry::RetryEvent`
//! implement [`TelemetryEvent`] and are dispatched through an
//! [`EventListeners<E>`] built up by that crate's config builder. The
//! orchestrator's `Orchestrator::new` is the only place both get a real
//! listener attached (folding each into `orc_stats::StatsManager`); tests in
//! either crate attach closures directly.

#[cfg(feature = "tracing")]
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// An event a component can emit for observability.
pub trait TelemetryEvent: Send + Sync + fmt::Debug {
    /// Machine-readable event discriminant (e.g. `"token_usage_update"`).
    fn kind(&self) -> &'static str;

    /// When the event occurred.
    fn timestamp(&self) -> Instant;

    /// Name of the emitting rate limiter or retry policy instance.
    fn source_name(&self) -> &str;
}

/// Receives events of a given type.
pub trait EventListener<E: TelemetryEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// An ordered set of listeners for one event type.
///
/// Emission never suspends and never propagates a listener's panic: a
/// panicking listener is isolated via `catch_unwind` so the remaining
/// listeners still run. The rate limiter and retry policy both rely on this —
/// neither can afford a misbehaving stats callback to take down the hot path.
#[derive(Clone)]
pub struct EventListeners<E: TelemetryEvent> {
    listeners: Vec<Arc<dyn EventListener<E>>>,
}

impl<E: TelemetryEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    pub fn emit(&self, event: &E) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if let Err(_panic_payload) = result {
                #[cfg(feature = "tracing")]
                log_listener_panic(index, event, _panic_payload.as_ref());

                #[cfg(not(feature = "tracing"))]
                let _ = index;
            }
        }
    }
}

impl<E: TelemetryEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts a plain closure into an [`EventListener`]. Used by the rate
/// limiter's and retry policy's builders for their `on_*` hooks, and to
/// translate into `orc_stats::RateLimiterEventKind` in the orchestrator.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: TelemetryEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

#[cfg(feature = "tracing")]
fn log_listener_panic<E: TelemetryEvent>(
    index: usize,
    event: &E,
    panic_payload: &(dyn Any + Send),
) {
    let panic_message = panic_payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic_payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    tracing::warn!(
        listener_index = index,
        source = event.source_name(),
        event_kind = event.kind(),
        panic_message = %panic_message,
        "rate limiter or retry telemetry listener panicked, continuing with remaining listeners"
    );
}
