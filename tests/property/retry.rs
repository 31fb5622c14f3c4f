//! Property tests for the retry middleware.
//!
//! Invariants tested:
//! - Exhaustion collects exactly max_attempts errors
//! - Success on the Nth attempt stops further calls
//! - The error policy short-circuits non-retryable errors

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use breakwater_retry::{RetryError, RetryLayer};
use proptest::prelude::*;
use tokio::runtime::Runtime;
use tower::{Layer, Service, ServiceExt};

#[derive(Debug, Clone, PartialEq)]
enum TestError {
    Transient(usize),
    Fatal,
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Transient(n) => write!(f, "transient error {n}"),
            TestError::Fatal => write!(f, "fatal error"),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Property: exhaustion reports every attempt's error, in order.
    #[test]
    fn exhaustion_collects_every_error(max_attempts in 1usize..=8) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let c = Arc::clone(&calls);

            let svc = tower::service_fn(move |_req: ()| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(TestError::Transient(n)) }
            });

            let layer = RetryLayer::<(), TestError>::builder()
                .max_attempts(max_attempts)
                .fixed_backoff(Duration::from_millis(1))
                .build();
            let mut service = layer.layer(svc);

            let err = service.ready().await.unwrap().call(()).await.unwrap_err();
            match err {
                RetryError::Exhausted { attempts, errors } => {
                    prop_assert_eq!(attempts, max_attempts);
                    let expected: Vec<_> =
                        (0..max_attempts).map(TestError::Transient).collect();
                    prop_assert_eq!(errors, expected);
                }
                other => prop_assert!(false, "unexpected error: {other:?}"),
            }
            prop_assert_eq!(calls.load(Ordering::SeqCst), max_attempts);
            Ok(())
        })?;
    }

    /// Property: success on attempt N makes exactly N calls.
    #[test]
    fn success_stops_retrying(
        max_attempts in 2usize..=8,
        succeed_on in 1usize..=8,
    ) {
        if succeed_on > max_attempts {
            return Ok(());
        }

        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let c = Arc::clone(&calls);

            let svc = tower::service_fn(move |_req: ()| {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n >= succeed_on {
                        Ok(n)
                    } else {
                        Err(TestError::Transient(n))
                    }
                }
            });

            let layer = RetryLayer::<(), TestError>::builder()
                .max_attempts(max_attempts)
                .fixed_backoff(Duration::from_millis(1))
                .build();
            let mut service = layer.layer(svc);

            let out = service.ready().await.unwrap().call(()).await.unwrap();
            prop_assert_eq!(out, succeed_on);
            prop_assert_eq!(calls.load(Ordering::SeqCst), succeed_on);
            Ok(())
        })?;
    }

    /// Property: a non-retryable error makes exactly one call.
    #[test]
    fn error_policy_short_circuits(max_attempts in 1usize..=8) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let c = Arc::clone(&calls);

            let svc = tower::service_fn(move |_req: ()| {
                c.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(TestError::Fatal) }
            });

            let layer = RetryLayer::<(), TestError>::builder()
                .max_attempts(max_attempts)
                .fixed_backoff(Duration::from_millis(1))
                .retry_on(|e| !matches!(e, TestError::Fatal))
                .build();
            let mut service = layer.layer(svc);

            let err = service.ready().await.unwrap().call(()).await.unwrap_err();
            prop_assert!(matches!(err, RetryError::Rejected(TestError::Fatal)));
            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            Ok(())
        })?;
    }
}
