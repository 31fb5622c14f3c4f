use std::sync::Arc;

use tower::Layer;

use crate::{Timeout, TimeoutConfig};

/// A Tower [`Layer`] that bounds how long the inner call may run.
///
/// # Example
///
/// ```
/// use breakwater_timeout::TimeoutLayer;
/// use std::time::Duration;
///
/// let layer = TimeoutLayer::<String>::builder()
///     .wait_time(Duration::from_millis(500))
///     .on_timeout(|wait| eprintln!("timed out after {wait:?}"))
///     .build();
/// ```
#[derive(Clone)]
pub struct TimeoutLayer<Req> {
    config: Arc<TimeoutConfig<Req>>,
}

impl<Req> TimeoutLayer<Req> {
    /// Creates a new `TimeoutLayer` from the given configuration.
    pub fn new(config: TimeoutConfig<Req>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a builder for configuring a timeout layer.
    pub fn builder() -> crate::TimeoutConfigBuilder<Req> {
        crate::TimeoutConfigBuilder::new()
    }
}

impl<S, Req> Layer<S> for TimeoutLayer<Req> {
    type Service = Timeout<S, Req>;

    fn layer(&self, service: S) -> Self::Service {
        Timeout::new(service, Arc::clone(&self.config))
    }
}
