//! Property tests for backoff policies.
//!
//! Invariants tested:
//! - Every variant stays within [min_delay, max_delay] before jitter
//! - Jitter only ever shortens the delay
//! - Delays never panic, whatever the attempt number

use std::time::Duration;

use breakwater_core::backoff::BackoffPolicy;
use proptest::prelude::*;

fn bounded_policy(min_ms: u64, max_ms: u64, which: u8) -> BackoffPolicy {
    let min = Duration::from_millis(min_ms);
    let max = Duration::from_millis(max_ms);
    match which % 3 {
        0 => BackoffPolicy::linear(min, max),
        1 => BackoffPolicy::exponential(min, max),
        _ => BackoffPolicy::polynomial(min, max),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: bounded variants stay within [min, max] for every attempt.
    #[test]
    fn delays_stay_within_bounds(
        min_ms in 1u64..=1_000,
        extra_ms in 0u64..=60_000,
        which in 0u8..3,
        attempt in 1u32..=10_000,
    ) {
        let max_ms = min_ms + extra_ms;
        let policy = bounded_policy(min_ms, max_ms, which);
        let delay = policy.base_delay(attempt);

        prop_assert!(delay >= Duration::from_millis(min_ms),
            "delay {delay:?} under min {min_ms}ms");
        prop_assert!(delay <= Duration::from_millis(max_ms),
            "delay {delay:?} over max {max_ms}ms");
    }

    /// Property: jitter shortens the delay by at most the jitter factor.
    #[test]
    fn jitter_only_shortens(
        delay_ms in 1u64..=10_000,
        jitter in 0.01f64..=1.0,
        attempt in 1u32..=100,
    ) {
        let policy = BackoffPolicy::constant(Duration::from_millis(delay_ms))
            .with_jitter(jitter);
        let base = Duration::from_millis(delay_ms);
        let jittered = policy.delay(attempt);

        prop_assert!(jittered <= base);
        prop_assert!(jittered >= base.mul_f64(1.0 - jitter),
            "jittered {jittered:?} shrank below the jitter floor");
    }

    /// Property: extreme attempts saturate instead of panicking.
    #[test]
    fn extreme_attempts_never_panic(
        which in 0u8..3,
        attempt in proptest::num::u32::ANY,
    ) {
        let policy = bounded_policy(10, 60_000, which);
        let _ = policy.base_delay(attempt);
    }
}
