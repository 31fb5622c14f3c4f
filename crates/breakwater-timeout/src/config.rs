use std::sync::Arc;
use std::time::Duration;

use breakwater_core::events::{EventListeners, FnListener};
use breakwater_core::signal::SignalBinder;

use crate::events::TimeoutEvent;

/// Configuration for the timeout middleware.
pub struct TimeoutConfig<Req> {
    pub(crate) wait_time: Duration,
    pub(crate) signal_binder: Option<Arc<dyn SignalBinder<Req>>>,
    pub(crate) event_listeners: EventListeners<TimeoutEvent>,
    pub(crate) name: String,
}

/// Builder for [`TimeoutConfig`].
pub struct TimeoutConfigBuilder<Req> {
    wait_time: Duration,
    signal_binder: Option<Arc<dyn SignalBinder<Req>>>,
    event_listeners: EventListeners<TimeoutEvent>,
    name: String,
}

impl<Req> Default for TimeoutConfigBuilder<Req> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req> TimeoutConfigBuilder<Req> {
    /// Creates a new builder with a 2 second wait time.
    pub fn new() -> Self {
        Self {
            wait_time: Duration::from_secs(2),
            signal_binder: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the wait time.
    pub fn wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Sets the signal binder used to forward a child cancellation token
    /// into the request, so the inner call can stop work when the timer
    /// fires.
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

    /// Registers a callback invoked when the wait time elapses.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::TimedOut { wait_time, .. } = event {
                f(*wait_time);
            }
        }));
        self
    }

    /// Registers a callback invoked when the inner call completes in time.
    pub fn on_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::Completed { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Builds the timeout layer.
    pub fn build(self) -> crate::TimeoutLayer<Req> {
        crate::TimeoutLayer::new(TimeoutConfig {
            wait_time: self.wait_time,
            signal_binder: self.signal_binder,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeoutLayer;

    #[test]
    fn builder_defaults() {
        let _layer = TimeoutLayer::<()>::builder().build();
    }

    #[test]
    fn builder_custom_values() {
        let _layer = TimeoutLayer::<()>::builder()
            .wait_time(Duration::from_millis(250))
            .name("db-timeout")
            .on_timeout(|_| {})
            .build();
    }
}
