use std::sync::Arc;
use std::time::Duration;

use breakwater_core::events::{EventListeners, FnListener};
use breakwater_core::signal::SignalBinder;

use crate::events::BulkheadEvent;

/// Configuration for the bulkhead middleware.
pub struct BulkheadConfig<Req> {
    pub(crate) max_concurrency: usize,
    pub(crate) max_capacity: Option<usize>,
    pub(crate) interval: Duration,
    pub(crate) signal_binder: Option<Arc<dyn SignalBinder<Req>>>,
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
    pub(crate) name: String,
}

/// Builder for [`BulkheadConfig`].
pub struct BulkheadConfigBuilder<Req> {
    max_concurrency: usize,
    max_capacity: Option<usize>,
    interval: Duration,
    signal_binder: Option<Arc<dyn SignalBinder<Req>>>,
    event_listeners: EventListeners<BulkheadEvent>,
    name: String,
}

impl<Req> Default for BulkheadConfigBuilder<Req> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req> BulkheadConfigBuilder<Req> {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - max_concurrency: 25
    /// - max_capacity: unbounded
    /// - interval: 0 (no pacing)
    pub fn new() -> Self {
        Self {
            max_concurrency: 25,
            max_capacity: None,
            interval: Duration::ZERO,
            signal_binder: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the number of calls processed in parallel.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrency` is zero.
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        assert!(max_concurrency > 0, "max_concurrency must be at least 1");
        self.max_concurrency = max_concurrency;
        self
    }

    /// Bounds the waiting queue. Calls arriving while the queue holds
    /// `max_capacity` entries are rejected without being enqueued.
    pub fn max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = Some(max_capacity);
        self
    }

    /// Removes the queue bound.
    pub fn unbounded_capacity(mut self) -> Self {
        self.max_capacity = None;
        self
    }

    /// Paces throughput: at most `max_concurrency` calls start per
    /// `interval`. Zero disables pacing.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the signal binder used to read a cancellation token out of the
    /// request; a cancelled token fails a queued call without invoking the
    /// inner service.
    pub fn signal_binder<B>(mut self, binder: B) -> Self
    where
        B: SignalBinder<Req> + 'static,
    {
        self.signal_binder = Some(Arc::new(binder));
        self
    }

    /// Sets the instance name used in events.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a call starts processing.
    pub fn on_processing<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::Processing {
                concurrent_calls, ..
            } = event
            {
                f(*concurrent_calls);
            }
        }));
        self
    }

    /// Registers a callback invoked when a call is rejected at capacity.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::Rejected { max_capacity, .. } = event {
                f(*max_capacity);
            }
        }));
        self
    }

    /// Builds the bulkhead layer.
    pub fn build(self) -> crate::BulkheadLayer<Req> {
        crate::BulkheadLayer::new(BulkheadConfig {
            max_concurrency: self.max_concurrency,
            max_capacity: self.max_capacity,
            interval: self.interval,
            signal_binder: self.signal_binder,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BulkheadLayer;

    #[test]
    fn builder_defaults() {
        let _layer = BulkheadLayer::<()>::builder().build();
    }

    #[test]
    fn builder_custom_values() {
        let _layer = BulkheadLayer::<()>::builder()
            .max_concurrency(2)
            .max_capacity(10)
            .interval(Duration::from_millis(100))
            .name("io-pool")
            .build();
    }

    #[test]
    #[should_panic(expected = "max_concurrency")]
    fn zero_concurrency_panics() {
        let _ = BulkheadLayer::<()>::builder().max_concurrency(0);
    }
}
