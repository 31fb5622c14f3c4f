//! Hedging middleware for Tower services.
//!
//! A hedge wraps a primary service together with a list of named fallback
//! candidates and masks failures or tail latency by trying more than one of
//! them:
//!
//! - **Sequential** mode tries the primary, then each fallback in order, and
//!   returns the first value the error policy accepts. Exhaustion rethrows
//!   the last collected error.
//! - **Parallel** mode starts every candidate at once under a shared wait
//!   time. The first value accepted by the error policy wins and the losers
//!   are cancelled; if everything fails (or the wait time expires) the error
//!   carries every candidate's error.
//!
//! Cancellation: each parallel candidate runs under its own child token,
//! forwarded into its request through the configured
//! [`SignalBinder`](breakwater_core::signal::SignalBinder); losers are
//! cancelled through their tokens and their futures dropped.
//!
//! # Example
//!
//! ```
//! use breakwater_hedge::HedgeLayer;
//! use tower::{Layer, service_fn};
//!
//! # #[derive(Debug, Clone)]
//! # struct MyError;
//! # async fn example() {
//! let layer = HedgeLayer::<String, String, MyError>::builder()
//!     .fallback(|req: String| async move { Ok(format!("cache: {req}")) })
//!     .build();
//!
//! let svc = service_fn(|req: String| async move { Ok::<_, MyError>(req) });
//! let mut service = layer.layer(svc);
//! # }
//! ```

mod config;
mod error;
mod events;
mod layer;

pub use config::{
    CandidateFn, HedgeConfig, HedgeConfigBuilder, HedgeMode, ValueClassifier, PRIMARY_NAME,
};
pub use error::HedgeError;
pub use events::HedgeEvent;
pub use layer::HedgeLayer;

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use breakwater_core::signal::CancellationToken;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tower::Service;

/// Hedging service wrapping a primary service and its fallback candidates.
pub struct Hedge<S, Req, Res, E> {
    inner: S,
    config: Arc<HedgeConfig<Req, Res, E>>,
}

impl<S, Req, Res, E> Hedge<S, Req, Res, E> {
    pub(crate) fn new(inner: S, config: Arc<HedgeConfig<Req, Res, E>>) -> Self {
        Self { inner, config }
    }
}

impl<S: Clone, Req, Res, E> Clone for Hedge<S, Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, Res, E> Service<Req> for Hedge<S, Req, Res, E>
where
    S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    type Response = Res;
    type Error = HedgeError<E>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(HedgeError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let config = Arc::clone(&self.config);
        let clone = self.inner.clone();
        // Take the ready service, leave the fresh clone behind.
        let service = std::mem::replace(&mut self.inner, clone);

        match config.mode {
            HedgeMode::Sequential => Box::pin(execute_sequential(service, req, config)),
            HedgeMode::Parallel => Box::pin(execute_parallel(service, req, config)),
        }
    }
}

/// Applies the value policy to a candidate result.
fn classify<Res, E>(
    result: Result<Res, E>,
    config: &HedgeConfig<impl Sized, Res, E>,
) -> Result<Res, E> {
    match (&config.value_classifier, result) {
        (Some(classifier), Ok(value)) => match classifier(&value) {
            Some(error) => Err(error),
            None => Ok(value),
        },
        (_, result) => result,
    }
}

async fn execute_sequential<S, Req, Res, E>(
    mut service: S,
    req: Req,
    config: Arc<HedgeConfig<Req, Res, E>>,
) -> Result<Res, HedgeError<E>>
where
    S: Service<Req, Response = Res, Error = E> + Send + 'static,
    S::Future: Send,
    Req: Clone + Send + 'static,
{
    let names = config.candidate_names();
    let signal = config
        .signal_binder
        .as_ref()
        .and_then(|binder| binder.signal_of(&req));
    let start = Instant::now();
    let mut last_error: Option<E> = None;

    for (idx, name) in names.iter().enumerate() {
        if let Some(signal) = &signal {
            if signal.is_cancelled() {
                return Err(HedgeError::Cancelled);
            }
        }

        config.event_listeners.emit(&HedgeEvent::AttemptStarted {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            candidate: name.clone(),
        });

        let result = if idx == 0 {
            service.call(req.clone()).await
        } else {
            (config.fallbacks[idx - 1].1)(req.clone()).await
        };

        match classify(result, &config) {
            Ok(value) => {
                config.event_listeners.emit(&HedgeEvent::Succeeded {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    candidate: name.clone(),
                    duration: start.elapsed(),
                });
                return Ok(value);
            }
            Err(error) => {
                config.event_listeners.emit(&HedgeEvent::AttemptFailed {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    candidate: name.clone(),
                });
                last_error = Some(error);
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(hedge = %config.name, attempts = names.len(), "all candidates failed");

    #[cfg(feature = "metrics")]
    metrics::counter!("hedge_all_failed_total", "hedge" => config.name.clone()).increment(1);

    config.event_listeners.emit(&HedgeEvent::AllFailed {
        pattern_name: config.name.clone(),
        timestamp: Instant::now(),
        attempts: names.len(),
    });

    Err(HedgeError::Inner(
        last_error.expect("the primary candidate always runs"),
    ))
}

async fn execute_parallel<S, Req, Res, E>(
    service: S,
    req: Req,
    config: Arc<HedgeConfig<Req, Res, E>>,
) -> Result<Res, HedgeError<E>>
where
    S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    let names = config.candidate_names();
    let total = names.len();
    let parent = config
        .signal_binder
        .as_ref()
        .and_then(|binder| binder.signal_of(&req));
    let start = Instant::now();

    let (tx, mut rx) = mpsc::channel::<(usize, Result<Res, E>)>(total);
    let mut tokens: Vec<CancellationToken> = Vec::with_capacity(total);

    for (idx, name) in names.iter().enumerate() {
        let token = parent
            .as_ref()
            .map(|p| p.child_token())
            .unwrap_or_default();
        tokens.push(token.clone());

        let candidate_req = match &config.signal_binder {
            Some(binder) => binder.forward(req.clone(), token.clone()),
            None => req.clone(),
        };

        config.event_listeners.emit(&HedgeEvent::AttemptStarted {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            candidate: name.clone(),
        });

        let fut: BoxFuture<'static, Result<Res, E>> = if idx == 0 {
            let mut svc = service.clone();
            Box::pin(async move { svc.call(candidate_req).await })
        } else {
            (config.fallbacks[idx - 1].1)(candidate_req)
        };

        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = fut => {
                    let _ = tx.send((idx, result)).await;
                }
            }
        });
    }
    drop(tx);

    let deadline = tokio::time::sleep(config.wait_time);
    tokio::pin!(deadline);
    let mut errors: Vec<(String, E)> = Vec::new();

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some((idx, result)) => match classify(result, &config) {
                    Ok(value) => {
                        for token in &tokens {
                            token.cancel();
                        }
                        config.event_listeners.emit(&HedgeEvent::Succeeded {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            candidate: names[idx].clone(),
                            duration: start.elapsed(),
                        });
                        return Ok(value);
                    }
                    Err(error) => {
                        config.event_listeners.emit(&HedgeEvent::AttemptFailed {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            candidate: names[idx].clone(),
                        });
                        errors.push((names[idx].clone(), error));
                    }
                },
                None => {
                    #[cfg(feature = "metrics")]
                    metrics::counter!("hedge_all_failed_total", "hedge" => config.name.clone())
                        .increment(1);

                    config.event_listeners.emit(&HedgeEvent::AllFailed {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: total,
                    });
                    return Err(HedgeError::AllFailed { errors });
                }
            },
            _ = &mut deadline => {
                for token in &tokens {
                    token.cancel();
                }

                #[cfg(feature = "tracing")]
                tracing::debug!(hedge = %config.name, wait_time = ?config.wait_time, "race timed out");

                config.event_listeners.emit(&HedgeEvent::TimedOut {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    wait_time: config.wait_time,
                });
                return Err(HedgeError::TimedOut { errors });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::{Layer, ServiceExt};

    #[derive(Debug, Clone, PartialEq)]
    struct TestError(&'static str);

    #[tokio::test]
    async fn sequential_falls_through_to_the_first_success() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let failed = Arc::new(Mutex::new(Vec::new()));
        let (o, f) = (Arc::clone(&order), Arc::clone(&failed));

        let layer = HedgeLayer::<(), &'static str, TestError>::builder()
            .fallback(|_req| async { Err(TestError("fallback-1 down")) })
            .fallback(|_req| async { Ok("v") })
            .on_attempt(move |candidate| o.lock().unwrap().push(candidate.to_string()))
            .on_attempt_failed(move |candidate| f.lock().unwrap().push(candidate.to_string()))
            .build();

        let mut service = layer.layer(tower::service_fn(|_req: ()| async {
            Err::<&'static str, _>(TestError("primary down"))
        }));

        let out = service.ready().await.unwrap().call(()).await.unwrap();
        assert_eq!(out, "v");
        assert_eq!(
            *order.lock().unwrap(),
            vec!["__primary", "fallback-1", "fallback-2"]
        );
        assert_eq!(*failed.lock().unwrap(), vec!["__primary", "fallback-1"]);
    }

    #[tokio::test]
    async fn sequential_exhaustion_rethrows_the_last_error() {
        let layer = HedgeLayer::<(), (), TestError>::builder()
            .fallback(|_req| async { Err(TestError("second")) })
            .build();

        let mut service = layer.layer(tower::service_fn(|_req: ()| async {
            Err::<(), _>(TestError("first"))
        }));

        let err = service.ready().await.unwrap().call(()).await.unwrap_err();
        assert!(matches!(err, HedgeError::Inner(TestError("second"))));
    }

    #[tokio::test]
    async fn sequential_does_not_start_later_candidates_after_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let layer = HedgeLayer::<(), &'static str, TestError>::builder()
            .fallback(move |_req| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok("fallback")
                }
            })
            .build();

        let mut service =
            layer.layer(tower::service_fn(|_req: ()| async { Ok("primary") }));

        let out = service.ready().await.unwrap().call(()).await.unwrap();
        assert_eq!(out, "primary");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn parallel_first_success_wins() {
        let layer = HedgeLayer::<(), &'static str, TestError>::builder()
            .parallel(Duration::from_secs(2))
            .fallback(|_req| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok("fast-fallback")
            })
            .build();

        let mut service = layer.layer(tower::service_fn(|_req: ()| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("slow-primary")
        }));

        let out = service.ready().await.unwrap().call(()).await.unwrap();
        assert_eq!(out, "fast-fallback");
    }

    #[tokio::test]
    async fn parallel_collects_every_error_on_total_failure() {
        let layer = HedgeLayer::<(), (), TestError>::builder()
            .parallel(Duration::from_secs(2))
            .fallback(|_req| async { Err(TestError("b")) })
            .fallback(|_req| async { Err(TestError("c")) })
            .build();

        let mut service = layer.layer(tower::service_fn(|_req: ()| async {
            Err::<(), _>(TestError("a"))
        }));

        let err = service.ready().await.unwrap().call(()).await.unwrap_err();
        match err {
            HedgeError::AllFailed { errors } => {
                assert_eq!(errors.len(), 3);
                let mut names: Vec<_> = errors.iter().map(|(n, _)| n.as_str()).collect();
                names.sort_unstable();
                assert_eq!(names, vec!["__primary", "fallback-1", "fallback-2"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn parallel_wait_time_expiry_cancels_the_race() {
        let layer = HedgeLayer::<(), (), TestError>::builder()
            .parallel(Duration::from_millis(30))
            .fallback(|_req| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .build();

        let mut service = layer.layer(tower::service_fn(|_req: ()| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        }));

        let start = Instant::now();
        let err = service.ready().await.unwrap().call(()).await.unwrap_err();
        assert!(err.is_timed_out());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn value_policy_rejects_ok_values() {
        let layer = HedgeLayer::<(), &'static str, TestError>::builder()
            .reject_value(|value: &&'static str| {
                (*value == "degraded").then_some(TestError("degraded value"))
            })
            .fallback(|_req| async { Ok("healthy") })
            .build();

        let mut service =
            layer.layer(tower::service_fn(|_req: ()| async { Ok("degraded") }));

        let out = service.ready().await.unwrap().call(()).await.unwrap();
        assert_eq!(out, "healthy");
    }
}
