use std::sync::Arc;

use tower::Layer;

use crate::breaker::CircuitBreakerAdapter;
use crate::classifier::DefaultClassifier;
use crate::policy::CircuitBreakerPolicy;
use crate::service::CircuitBreaker;

/// A Tower [`Layer`] that guards the inner service with a circuit breaker.
///
/// # Example
///
/// ```
/// use breakwater_circuitbreaker::{CircuitBreakerLayer, ConsecutivePolicy};
/// use tower::{Layer, service_fn};
///
/// # async fn example() {
/// let layer = CircuitBreakerLayer::builder(ConsecutivePolicy::new(5))
///     .name("downstream")
///     .build();
///
/// let svc = service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) });
/// let mut service = layer.layer(svc);
/// # }
/// ```
pub struct CircuitBreakerLayer<P: CircuitBreakerPolicy, C = DefaultClassifier> {
    adapter: Arc<CircuitBreakerAdapter<P>>,
    classifier: Arc<C>,
    key: String,
}

impl<P: CircuitBreakerPolicy, C> Clone for CircuitBreakerLayer<P, C> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            classifier: Arc::clone(&self.classifier),
            key: self.key.clone(),
        }
    }
}

impl<P: CircuitBreakerPolicy> CircuitBreakerLayer<P, DefaultClassifier> {
    /// Creates a builder around a policy.
    pub fn builder(policy: P) -> crate::CircuitBreakerConfigBuilder<P, DefaultClassifier> {
        crate::CircuitBreakerConfigBuilder::new(policy)
    }
}

impl<P: CircuitBreakerPolicy, C> CircuitBreakerLayer<P, C> {
    pub(crate) fn from_parts(
        adapter: Arc<CircuitBreakerAdapter<P>>,
        classifier: Arc<C>,
        key: String,
    ) -> Self {
        Self {
            adapter,
            classifier,
            key,
        }
    }

    /// The runtime adapter, for direct state inspection and control
    /// (`state_of`, `isolate`, `reset`).
    pub fn adapter(&self) -> Arc<CircuitBreakerAdapter<P>> {
        Arc::clone(&self.adapter)
    }
}

impl<S, P: CircuitBreakerPolicy, C> Layer<S> for CircuitBreakerLayer<P, C> {
    type Service = CircuitBreaker<S, P, C>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(
            service,
            Arc::clone(&self.adapter),
            Arc::clone(&self.classifier),
            self.key.clone(),
        )
    }
}
