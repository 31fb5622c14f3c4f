//! Property tests for circuit breaker policies.
//!
//! Invariants tested:
//! - The consecutive policy never opens before threshold failures in a row
//! - A success while closed resets the failure run
//! - The count-window policy never transitions below its minimum calls

use std::time::{Duration, SystemTime};

use breakwater_circuitbreaker::policy::{
    CircuitBreakerPolicy, ClosedOutcome, ConsecutivePolicy, CountWindowPolicy, Phase,
};
use proptest::prelude::*;

fn now() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the consecutive policy opens exactly when the current
    /// failure run reaches the threshold, never earlier.
    #[test]
    fn consecutive_opens_only_at_threshold_runs(
        threshold in 1u32..=10,
        outcomes in prop::collection::vec(any::<bool>(), 0..100),
    ) {
        let policy = ConsecutivePolicy::new(threshold);
        let mut metrics = policy.initial_metrics();
        let mut run = 0u32;

        for success in outcomes {
            if success {
                policy.track_success(&mut metrics, Phase::Closed, now());
                run = 0;
            } else {
                policy.track_failure(&mut metrics, Phase::Closed, now());
                run += 1;
            }

            let outcome = policy.when_closed(&metrics, now());
            if run >= threshold {
                prop_assert_eq!(outcome, ClosedOutcome::ToOpen);
            } else {
                prop_assert_eq!(outcome, ClosedOutcome::Stay,
                    "opened after a run of only {} failures (threshold {})",
                    run, threshold);
            }
        }
    }

    /// Property: failures observed while closed are weakly monotone in the
    /// metrics until a success resets them.
    #[test]
    fn consecutive_failure_count_is_monotone(failures in 0u32..100) {
        let policy = ConsecutivePolicy::new(u32::MAX);
        let mut metrics = policy.initial_metrics();

        let mut previous = 0;
        for _ in 0..failures {
            policy.track_failure(&mut metrics, Phase::Closed, now());
            prop_assert!(metrics.failure_count >= previous);
            previous = metrics.failure_count;
        }
        prop_assert_eq!(metrics.failure_count, failures);
    }

    /// Property: the count-window policy holds below minimum calls, no
    /// matter how bad the outcomes.
    #[test]
    fn count_window_waits_for_minimum_calls(
        size in 4usize..=32,
        minimum in 1usize..=32,
        failures in 0usize..=31,
    ) {
        let policy = CountWindowPolicy::new(size)
            .with_failure_threshold(0.0)
            .with_minimum_calls(minimum);
        let mut metrics = policy.initial_metrics();

        for _ in 0..failures.min(minimum.saturating_sub(1)) {
            policy.track_failure(&mut metrics, Phase::Closed, now());
        }
        prop_assert_eq!(policy.when_closed(&metrics, now()), ClosedOutcome::Stay);
    }
}
