//! Property tests for parallel hedging.
//!
//! Invariant tested: whenever at least one candidate succeeds within the
//! wait time, the overall call resolves to a successful candidate's value.

use std::time::Duration;

use breakwater_hedge::HedgeLayer;
use proptest::prelude::*;
use tokio::runtime::Runtime;
use tower::{Layer, Service, ServiceExt};

#[derive(Debug, Clone, PartialEq)]
struct TestError;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: a race with at least one succeeding candidate resolves to
    /// a success.
    #[test]
    fn any_success_resolves_the_race(
        candidate_outcomes in prop::collection::vec(any::<bool>(), 1..6),
        primary_succeeds in any::<bool>(),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let mut builder = HedgeLayer::<(), usize, TestError>::builder()
                .parallel(Duration::from_secs(5));

            for (index, succeeds) in candidate_outcomes.iter().copied().enumerate() {
                builder = builder.fallback(move |_req| async move {
                    if succeeds {
                        Ok(index + 1)
                    } else {
                        Err(TestError)
                    }
                });
            }

            let layer = builder.build();
            let mut service = layer.layer(tower::service_fn(move |_req: ()| async move {
                if primary_succeeds {
                    Ok(0usize)
                } else {
                    Err(TestError)
                }
            }));

            let any_success = primary_succeeds || candidate_outcomes.iter().any(|s| *s);
            let result = service.ready().await.unwrap().call(()).await;

            if any_success {
                let winner = result.expect("a successful candidate must win");
                if winner == 0 {
                    prop_assert!(primary_succeeds);
                } else {
                    prop_assert!(candidate_outcomes[winner - 1]);
                }
            } else {
                prop_assert!(result.is_err());
            }
            Ok(())
        })?;
    }

    /// Property: with every candidate failing, the error carries one entry
    /// per candidate.
    #[test]
    fn total_failure_collects_every_candidate(fallbacks in 0usize..5) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let mut builder = HedgeLayer::<(), usize, TestError>::builder()
                .parallel(Duration::from_secs(5));
            for _ in 0..fallbacks {
                builder = builder.fallback(|_req| async { Err(TestError) });
            }

            let layer = builder.build();
            let mut service = layer.layer(tower::service_fn(|_req: ()| async {
                Err::<usize, _>(TestError)
            }));

            let err = service.ready().await.unwrap().call(()).await.unwrap_err();
            prop_assert_eq!(err.into_errors().len(), fallbacks + 1);
            Ok(())
        })?;
    }
}
