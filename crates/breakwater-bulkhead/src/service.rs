//! Bulkhead service implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::{Mutex, Semaphore};
use tower::Service;

use crate::config::BulkheadConfig;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Pool state shared by every service a layer produces.
pub(crate) struct Shared {
    semaphore: Arc<Semaphore>,
    queued: AtomicUsize,
    pacer: Option<Mutex<Pacer>>,
    max_concurrency: usize,
    interval: Duration,
}

/// Token bucket issuing `max_concurrency` starts per interval.
struct Pacer {
    window_start: Instant,
    issued: usize,
}

impl Shared {
    pub(crate) fn new<Req>(config: &BulkheadConfig<Req>) -> Self {
        let pacer = (config.interval > Duration::ZERO).then(|| {
            Mutex::new(Pacer {
                window_start: Instant::now(),
                issued: 0,
            })
        });
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrency)),
            queued: AtomicUsize::new(0),
            pacer,
            max_concurrency: config.max_concurrency,
            interval: config.interval,
        }
    }

    /// Reserves a queue slot, failing when the queue is at capacity.
    fn try_enqueue(&self, max_capacity: Option<usize>) -> bool {
        match max_capacity {
            None => {
                self.queued.fetch_add(1, Ordering::SeqCst);
                true
            }
            Some(cap) => self
                .queued
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |q| {
                    (q < cap).then_some(q + 1)
                })
                .is_ok(),
        }
    }

    /// Waits until the token bucket grants a start.
    async fn pace(&self) {
        let Some(pacer) = &self.pacer else { return };
        loop {
            let wait = {
                let mut state = pacer.lock().await;
                let now = Instant::now();
                if now.duration_since(state.window_start) >= self.interval {
                    state.window_start = now;
                    state.issued = 0;
                }
                if state.issued < self.max_concurrency {
                    state.issued += 1;
                    None
                } else {
                    Some(self.interval - now.duration_since(state.window_start))
                }
            };
            match wait {
                None => return,
                Some(wait) => tokio::time::sleep(wait).await,
            }
        }
    }
}

/// Occupies one queue slot until the call starts running or is dropped
/// while waiting.
struct QueueGuard {
    shared: Arc<Shared>,
}

impl Drop for QueueGuard {
    fn drop(&mut self) {
        self.shared.queued.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bulkhead service that limits concurrent calls.
pub struct Bulkhead<S, Req> {
    inner: S,
    config: Arc<BulkheadConfig<Req>>,
    shared: Arc<Shared>,
}

impl<S, Req> Bulkhead<S, Req> {
    pub(crate) fn new(inner: S, config: Arc<BulkheadConfig<Req>>, shared: Arc<Shared>) -> Self {
        Self {
            inner,
            config,
            shared,
        }
    }
}

impl<S: Clone, Req> Clone for Bulkhead<S, Req> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, Req> Service<Req> for Bulkhead<S, Req>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = BulkheadError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(BulkheadError::Inner)
    }

    fn call(&mut self, request: Req) -> Self::Future {
        let mut inner = self.inner.clone();
        let config = Arc::clone(&self.config);
        let shared = Arc::clone(&self.shared);

        // Capacity is enforced before anything is enqueued, so a full queue
        // rejects synchronously relative to the caller's await.
        let queue_slot = shared.try_enqueue(config.max_capacity).then(|| QueueGuard {
            shared: Arc::clone(&shared),
        });
        let signal = config
            .signal_binder
            .as_ref()
            .and_then(|binder| binder.signal_of(&request));

        Box::pin(async move {
            let Some(queue_slot) = queue_slot else {
                let max_capacity = config.max_capacity.unwrap_or(usize::MAX);
                config.event_listeners.emit(&BulkheadEvent::Rejected {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    max_capacity,
                });

                #[cfg(feature = "metrics")]
                counter!("bulkhead_calls_rejected_total", "bulkhead" => config.name.clone())
                    .increment(1);

                return Err(BulkheadError::CapacityFull { max_capacity });
            };

            let start = Instant::now();

            let permit = match &signal {
                Some(signal) => {
                    tokio::select! {
                        permit = Arc::clone(&shared.semaphore).acquire_owned() => permit,
                        _ = signal.cancelled() => {
                            config.event_listeners.emit(&BulkheadEvent::Cancelled {
                                pattern_name: config.name.clone(),
                                timestamp: Instant::now(),
                            });
                            return Err(BulkheadError::Cancelled);
                        }
                    }
                }
                None => Arc::clone(&shared.semaphore).acquire_owned().await,
            };
            // The semaphore is never closed while the pool is alive.
            let permit = permit.expect("bulkhead semaphore closed");
            drop(queue_slot);

            // A cancellation that raced the permit still wins: the task
            // leaves the queue without touching the inner service.
            if let Some(signal) = &signal {
                if signal.is_cancelled() {
                    config.event_listeners.emit(&BulkheadEvent::Cancelled {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    return Err(BulkheadError::Cancelled);
                }
            }

            shared.pace().await;

            let concurrent_calls =
                shared.max_concurrency - shared.semaphore.available_permits();
            config.event_listeners.emit(&BulkheadEvent::Processing {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                concurrent_calls,
            });

            #[cfg(feature = "metrics")]
            gauge!("bulkhead_concurrent_calls", "bulkhead" => config.name.clone())
                .set(concurrent_calls as f64);

            let result = inner.call(request).await;
            drop(permit);

            let duration = start.elapsed();
            match &result {
                Ok(_) => {
                    config.event_listeners.emit(&BulkheadEvent::Finished {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        duration,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("bulkhead_calls_finished_total", "bulkhead" => config.name.clone())
                        .increment(1);
                }
                Err(_) => {
                    config.event_listeners.emit(&BulkheadEvent::Failed {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        duration,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("bulkhead_calls_failed_total", "bulkhead" => config.name.clone())
                        .increment(1);
                }
            }

            result.map_err(BulkheadError::Inner)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BulkheadLayer;
    use tower::{service_fn, Layer, ServiceExt};

    #[tokio::test]
    async fn concurrency_never_exceeds_the_cap() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (cur, pk) = (Arc::clone(&current), Arc::clone(&peak));

        let layer = BulkheadLayer::<u32>::builder().max_concurrency(2).build();

        let svc = service_fn(move |_req: u32| {
            let cur = Arc::clone(&cur);
            let pk = Arc::clone(&pk);
            async move {
                let now = cur.fetch_add(1, Ordering::SeqCst) + 1;
                pk.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                cur.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ()>(())
            }
        });

        let service = layer.layer(svc);
        let mut handles = Vec::new();
        for i in 0..5 {
            let mut svc = service.clone();
            handles.push(tokio::spawn(async move {
                svc.ready().await.unwrap().call(i).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn full_queue_rejects_without_enqueueing() {
        let layer = BulkheadLayer::<()>::builder()
            .max_concurrency(1)
            .max_capacity(1)
            .build();

        let svc = service_fn(|_req: ()| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, ()>(())
        });

        let service = layer.layer(svc);

        // First call occupies the worker, second occupies the queue slot.
        let mut s1 = service.clone();
        let mut s2 = service.clone();
        let t1 = tokio::spawn(async move { s1.ready().await.unwrap().call(()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let t2 = tokio::spawn(async move { s2.ready().await.unwrap().call(()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut s3 = service.clone();
        let err = s3.ready().await.unwrap().call(()).await.unwrap_err();
        assert!(err.is_capacity_full());

        t1.await.unwrap().unwrap();
        t2.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn interval_paces_throughput() {
        let layer = BulkheadLayer::<u32>::builder()
            .max_concurrency(2)
            .interval(Duration::from_millis(40))
            .build();

        let svc = service_fn(|_req: u32| async { Ok::<_, ()>(()) });
        let service = layer.layer(svc);

        let start = Instant::now();
        let mut handles = Vec::new();
        for i in 0..6 {
            let mut svc = service.clone();
            handles.push(tokio::spawn(async move {
                svc.ready().await.unwrap().call(i).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Six instant calls at two starts per 40ms need at least two extra
        // windows.
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn cancelled_queued_call_never_reaches_inner() {
        use breakwater_core::signal::{CancellationToken, FnBinder};

        #[derive(Clone)]
        struct Req {
            signal: CancellationToken,
        }

        let invoked = Arc::new(AtomicUsize::new(0));
        let inv = Arc::clone(&invoked);

        let layer = BulkheadLayer::<Req>::builder()
            .max_concurrency(1)
            .signal_binder(FnBinder::new(
                |req: &Req| Some(req.signal.clone()),
                |mut req: Req, signal| {
                    req.signal = signal;
                    req
                },
            ))
            .build();

        let svc = service_fn(move |req: Req| {
            let inv = Arc::clone(&inv);
            async move {
                if !req.signal.is_cancelled() {
                    inv.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, ()>(())
            }
        });

        let service = layer.layer(svc);

        // Occupy the single worker.
        let mut s1 = service.clone();
        let busy = Req {
            signal: CancellationToken::new(),
        };
        let t1 = tokio::spawn(async move { s1.ready().await.unwrap().call(busy).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Queue a call, then cancel it before a worker frees up.
        let token = CancellationToken::new();
        let queued = Req {
            signal: token.clone(),
        };
        let mut s2 = service.clone();
        let t2 = tokio::spawn(async move { s2.ready().await.unwrap().call(queued).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let err = t2.await.unwrap().unwrap_err();
        assert!(matches!(err, BulkheadError::Cancelled));
        t1.await.unwrap().unwrap();
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
    }
}
