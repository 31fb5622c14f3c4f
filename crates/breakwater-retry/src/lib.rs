//! Retry middleware for Tower services.
//!
//! Wraps a service and re-invokes it on failure according to a backoff
//! policy and an error policy. Unlike a last-error-only retry, the
//! exhaustion error carries every attempt's error in order.
//!
//! # Features
//!
//! - Backoff policies from `breakwater-core` (constant, linear, exponential,
//!   polynomial, jittered), optionally derived per error
//! - Error policy (`retry_on`) deciding which errors are retryable
//! - Per-request max attempts
//! - Cancellation observed between attempts and during backoff sleeps via a
//!   [`SignalBinder`](breakwater_core::signal::SignalBinder)
//! - Event system: attempt, delay, success, exhausted, ignored error
//!
//! # Example
//!
//! ```
//! use breakwater_retry::RetryLayer;
//! use tower::ServiceBuilder;
//! use std::time::Duration;
//!
//! # #[derive(Debug, Clone)]
//! # struct MyError;
//! # async fn example() {
//! let layer = RetryLayer::<String, MyError>::builder()
//!     .max_attempts(3)
//!     .fixed_backoff(Duration::from_millis(50))
//!     .on_delay(|attempt, delay| {
//!         println!("attempt {attempt} failed, retrying in {delay:?}");
//!     })
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service(tower::service_fn(|req: String| async move {
//!         Ok::<_, MyError>(req)
//!     }));
//! # }
//! ```

mod config;
mod error;
mod events;
mod layer;

pub use config::{BackoffSource, MaxAttemptsSource, RetryConfig, RetryConfigBuilder};
pub use error::RetryError;
pub use events::RetryEvent;
pub use layer::RetryLayer;

use std::marker::PhantomData;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::future::BoxFuture;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Retry service wrapping an inner service.
pub struct Retry<S, Req, E> {
    inner: S,
    config: Arc<RetryConfig<Req, E>>,
    _phantom: PhantomData<fn(Req) -> E>,
}

impl<S, Req, E> Retry<S, Req, E> {
    pub(crate) fn new(
        inner: S,
        config: Arc<RetryConfig<Req, E>>,
        _phantom: PhantomData<fn(Req) -> E>,
    ) -> Self {
        Self {
            inner,
            config,
            _phantom,
        }
    }
}

impl<S: Clone, Req, E> Clone for Retry<S, Req, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            _phantom: PhantomData,
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, Req, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = RetryError<E>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RetryError::Rejected)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut service = self.inner.clone();
        let config = Arc::clone(&self.config);

        let max_attempts = config.max_attempts_source.get(&req).max(1);
        let signal = config
            .signal_binder
            .as_ref()
            .and_then(|binder| binder.signal_of(&req));

        Box::pin(async move {
            let mut errors: Vec<E> = Vec::new();

            for attempt in 1..=max_attempts {
                config.event_listeners.emit(&RetryEvent::Attempt {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt,
                });

                match service.call(req.clone()).await {
                    Ok(response) => {
                        #[cfg(feature = "metrics")]
                        {
                            counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "success").increment(1);
                            histogram!("retry_attempts", "retry" => config.name.clone())
                                .record(attempt as f64);
                        }

                        #[cfg(feature = "tracing")]
                        if attempt > 1 {
                            debug!(retry = %config.name, attempts = attempt, "succeeded after retries");
                        }

                        config.event_listeners.emit(&RetryEvent::Success {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });
                        return Ok(response);
                    }
                    Err(error) => {
                        if let Some(signal) = &signal {
                            if signal.is_cancelled() {
                                config.event_listeners.emit(&RetryEvent::Cancelled {
                                    pattern_name: config.name.clone(),
                                    timestamp: Instant::now(),
                                    attempt,
                                });
                                return Err(RetryError::Cancelled);
                            }
                        }

                        if let Some(predicate) = &config.retry_predicate {
                            if !predicate(&error) {
                                config.event_listeners.emit(&RetryEvent::IgnoredError {
                                    pattern_name: config.name.clone(),
                                    timestamp: Instant::now(),
                                });
                                return Err(RetryError::Rejected(error));
                            }
                        }

                        if attempt == max_attempts {
                            errors.push(error);
                            break;
                        }

                        let delay = config
                            .backoff_source
                            .policy_for(&error)
                            .delay(attempt as u32);
                        errors.push(error);

                        config.event_listeners.emit(&RetryEvent::Delay {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempt,
                            delay,
                        });

                        match &signal {
                            Some(signal) => {
                                tokio::select! {
                                    _ = signal.cancelled() => {
                                        config.event_listeners.emit(&RetryEvent::Cancelled {
                                            pattern_name: config.name.clone(),
                                            timestamp: Instant::now(),
                                            attempt,
                                        });
                                        return Err(RetryError::Cancelled);
                                    }
                                    _ = tokio::time::sleep(delay) => {}
                                }
                            }
                            None => tokio::time::sleep(delay).await,
                        }
                    }
                }
            }

            #[cfg(feature = "metrics")]
            counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "exhausted")
                .increment(1);

            #[cfg(feature = "tracing")]
            warn!(retry = %config.name, attempts = max_attempts, "retry attempts exhausted");

            config.event_listeners.emit(&RetryEvent::Exhausted {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                attempts: max_attempts,
            });

            Err(RetryError::Exhausted {
                attempts: max_attempts,
                errors,
            })
        })
    }
}
