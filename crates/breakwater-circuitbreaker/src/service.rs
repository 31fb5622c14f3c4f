//! The circuit breaker Tower service.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::Service;

use crate::breaker::CircuitBreakerAdapter;
use crate::classifier::FailureClassifier;
use crate::error::CircuitBreakerError;
use crate::policy::CircuitBreakerPolicy;
use crate::state::StateName;

/// Circuit breaker service wrapping an inner service.
///
/// Each call first advances the breaker state. An `Open` or `Isolated`
/// outcome rejects the call without touching the inner service; otherwise the
/// inner result is recorded as a success or failure per the classifier.
pub struct CircuitBreaker<S, P: CircuitBreakerPolicy, C> {
    inner: S,
    adapter: Arc<CircuitBreakerAdapter<P>>,
    classifier: Arc<C>,
    key: String,
}

impl<S, P: CircuitBreakerPolicy, C> CircuitBreaker<S, P, C> {
    pub(crate) fn new(
        inner: S,
        adapter: Arc<CircuitBreakerAdapter<P>>,
        classifier: Arc<C>,
        key: String,
    ) -> Self {
        Self {
            inner,
            adapter,
            classifier,
            key,
        }
    }
}

impl<S: Clone, P: CircuitBreakerPolicy, C> Clone for CircuitBreaker<S, P, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            adapter: Arc::clone(&self.adapter),
            classifier: Arc::clone(&self.classifier),
            key: self.key.clone(),
        }
    }
}

impl<S, Req, P, C> Service<Req> for CircuitBreaker<S, P, C>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: Send + 'static,
    P: CircuitBreakerPolicy,
    C: FailureClassifier<S::Response, S::Error> + Send + Sync + 'static,
{
    type Response = S::Response;
    type Error = CircuitBreakerError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut inner = self.inner.clone();
        let adapter = Arc::clone(&self.adapter);
        let classifier = Arc::clone(&self.classifier);
        let key = self.key.clone();

        Box::pin(async move {
            let transition = adapter.update_state(&key).await?;

            match transition.to {
                StateName::Open => {
                    adapter.emit_rejected(&key, transition.to);
                    return Err(CircuitBreakerError::Open { key });
                }
                StateName::Isolated => {
                    adapter.emit_rejected(&key, transition.to);
                    return Err(CircuitBreakerError::Isolated { key });
                }
                state => adapter.emit_permitted(&key, state),
            }

            let result = inner.call(req).await;

            if classifier.is_failure(&result) {
                adapter.track_failure(&key).await?;
            } else {
                adapter.track_success(&key).await?;
            }

            result.map_err(CircuitBreakerError::Inner)
        })
    }
}
