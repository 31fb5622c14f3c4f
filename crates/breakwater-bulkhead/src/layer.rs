use std::sync::Arc;

use tower::Layer;

use crate::service::{Bulkhead, Shared};
use crate::BulkheadConfig;

/// A Tower [`Layer`] that bounds concurrent in-flight work.
///
/// Every service produced by one layer shares the same worker pool, queue
/// bound and pacer.
///
/// # Example
///
/// ```
/// use breakwater_bulkhead::BulkheadLayer;
/// use std::time::Duration;
///
/// let layer = BulkheadLayer::<String>::builder()
///     .max_concurrency(8)
///     .max_capacity(64)
///     .interval(Duration::from_millis(50))
///     .build();
/// ```
#[derive(Clone)]
pub struct BulkheadLayer<Req> {
    config: Arc<BulkheadConfig<Req>>,
    shared: Arc<Shared>,
}

impl<Req> BulkheadLayer<Req> {
    /// Creates a new `BulkheadLayer` from the given configuration.
    pub fn new(config: BulkheadConfig<Req>) -> Self {
        let shared = Arc::new(Shared::new(&config));
        Self {
            config: Arc::new(config),
            shared,
        }
    }

    /// Creates a builder for configuring a bulkhead layer.
    pub fn builder() -> crate::BulkheadConfigBuilder<Req> {
        crate::BulkheadConfigBuilder::new()
    }
}

impl<S, Req> Layer<S> for BulkheadLayer<Req> {
    type Service = Bulkhead<S, Req>;

    fn layer(&self, service: S) -> Self::Service {
        Bulkhead::new(service, Arc::clone(&self.config), Arc::clone(&self.shared))
    }
}
