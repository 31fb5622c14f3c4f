//! Backoff policies for retries, blocking acquisition and circuit reopening.
//!
//! A policy is a pure function from a 1-indexed attempt number to a delay.
//! Jitter, when enabled, only ever shortens the computed delay.

use std::time::Duration;

use rand::Rng;

/// Delay strategy applied between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffPolicy {
    /// The same delay for every attempt.
    Constant {
        delay: Duration,
        jitter: Option<f64>,
    },
    /// `min(max_delay, min_delay * attempt)`.
    Linear {
        min_delay: Duration,
        max_delay: Duration,
        jitter: Option<f64>,
    },
    /// `min(max_delay, min_delay * multiplier^(attempt - 1))`.
    Exponential {
        min_delay: Duration,
        max_delay: Duration,
        multiplier: u32,
        jitter: Option<f64>,
    },
    /// `min(max_delay, min_delay * attempt^degree)`.
    Polynomial {
        min_delay: Duration,
        max_delay: Duration,
        degree: u32,
        jitter: Option<f64>,
    },
}

impl BackoffPolicy {
    /// Creates a constant backoff.
    pub fn constant(delay: Duration) -> Self {
        BackoffPolicy::Constant {
            delay,
            jitter: None,
        }
    }

    /// Creates a linear backoff bounded by `max_delay`.
    pub fn linear(min_delay: Duration, max_delay: Duration) -> Self {
        BackoffPolicy::Linear {
            min_delay,
            max_delay,
            jitter: None,
        }
    }

    /// Creates an exponential backoff with the default multiplier of 2.
    pub fn exponential(min_delay: Duration, max_delay: Duration) -> Self {
        BackoffPolicy::Exponential {
            min_delay,
            max_delay,
            multiplier: 2,
            jitter: None,
        }
    }

    /// Creates a polynomial backoff with the default degree of 2.
    pub fn polynomial(min_delay: Duration, max_delay: Duration) -> Self {
        BackoffPolicy::Polynomial {
            min_delay,
            max_delay,
            degree: 2,
            jitter: None,
        }
    }

    /// Overrides the exponential multiplier. No effect on other variants.
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        if let BackoffPolicy::Exponential { multiplier: m, .. } = &mut self {
            *m = multiplier.max(1);
        }
        self
    }

    /// Overrides the polynomial degree. No effect on other variants.
    pub fn with_degree(mut self, degree: u32) -> Self {
        if let BackoffPolicy::Polynomial { degree: d, .. } = &mut self {
            *d = degree;
        }
        self
    }

    /// Enables jitter. The factor is clamped into `(0, 1]`; a factor of zero
    /// disables jitter again.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        let jitter = if factor > 0.0 {
            Some(factor.min(1.0))
        } else {
            None
        };
        match &mut self {
            BackoffPolicy::Constant { jitter: j, .. }
            | BackoffPolicy::Linear { jitter: j, .. }
            | BackoffPolicy::Exponential { jitter: j, .. }
            | BackoffPolicy::Polynomial { jitter: j, .. } => *j = jitter,
        }
        self
    }

    /// Disables jitter.
    pub fn without_jitter(self) -> Self {
        let mut policy = self;
        match &mut policy {
            BackoffPolicy::Constant { jitter, .. }
            | BackoffPolicy::Linear { jitter, .. }
            | BackoffPolicy::Exponential { jitter, .. }
            | BackoffPolicy::Polynomial { jitter, .. } => *jitter = None,
        }
        policy
    }

    /// Computes the delay for a 1-indexed attempt with jitter applied.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        match self.jitter() {
            Some(factor) => {
                let u: f64 = rand::rng().random();
                base.mul_f64(1.0 - factor * u)
            }
            None => base,
        }
    }

    /// Computes the delay for a 1-indexed attempt before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match *self {
            BackoffPolicy::Constant { delay, .. } => delay,
            BackoffPolicy::Linear {
                min_delay,
                max_delay,
                ..
            } => scale(min_delay, u64::from(attempt)).min(max_delay),
            BackoffPolicy::Exponential {
                min_delay,
                max_delay,
                multiplier,
                ..
            } => {
                let factor = u64::from(multiplier.max(1)).saturating_pow(attempt - 1);
                scale(min_delay, factor).min(max_delay)
            }
            BackoffPolicy::Polynomial {
                min_delay,
                max_delay,
                degree,
                ..
            } => {
                let factor = u64::from(attempt).saturating_pow(degree);
                scale(min_delay, factor).min(max_delay)
            }
        }
    }

    fn jitter(&self) -> Option<f64> {
        match *self {
            BackoffPolicy::Constant { jitter, .. }
            | BackoffPolicy::Linear { jitter, .. }
            | BackoffPolicy::Exponential { jitter, .. }
            | BackoffPolicy::Polynomial { jitter, .. } => jitter,
        }
    }
}

impl Default for BackoffPolicy {
    /// Exponential from 100ms capped at 60s, the workspace-wide default.
    fn default() -> Self {
        BackoffPolicy::exponential(Duration::from_millis(100), Duration::from_secs(60))
    }
}

/// Saturating `duration * factor`.
fn scale(duration: Duration, factor: u64) -> Duration {
    let nanos = duration.as_nanos().saturating_mul(u128::from(factor));
    if nanos > u128::from(u64::MAX) {
        Duration::from_nanos(u64::MAX)
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_ignores_attempt() {
        let policy = BackoffPolicy::constant(Duration::from_millis(250));
        assert_eq!(policy.base_delay(1), Duration::from_millis(250));
        assert_eq!(policy.base_delay(7), Duration::from_millis(250));
    }

    #[test]
    fn linear_scales_and_caps() {
        let policy = BackoffPolicy::linear(Duration::from_millis(100), Duration::from_millis(450));
        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(3), Duration::from_millis(300));
        assert_eq!(policy.base_delay(5), Duration::from_millis(450));
    }

    #[test]
    fn exponential_doubles_by_default() {
        let policy = BackoffPolicy::exponential(Duration::from_millis(100), Duration::from_secs(10));
        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(2), Duration::from_millis(200));
        assert_eq!(policy.base_delay(4), Duration::from_millis(800));
    }

    #[test]
    fn exponential_honours_multiplier_and_cap() {
        let policy = BackoffPolicy::exponential(Duration::from_millis(10), Duration::from_millis(500))
            .with_multiplier(3);
        assert_eq!(policy.base_delay(1), Duration::from_millis(10));
        assert_eq!(policy.base_delay(2), Duration::from_millis(30));
        assert_eq!(policy.base_delay(3), Duration::from_millis(90));
        assert_eq!(policy.base_delay(10), Duration::from_millis(500));
    }

    #[test]
    fn polynomial_squares_by_default() {
        let policy = BackoffPolicy::polynomial(Duration::from_millis(10), Duration::from_secs(10));
        assert_eq!(policy.base_delay(1), Duration::from_millis(10));
        assert_eq!(policy.base_delay(2), Duration::from_millis(40));
        assert_eq!(policy.base_delay(3), Duration::from_millis(90));
    }

    #[test]
    fn huge_attempts_saturate_instead_of_panicking() {
        let policy = BackoffPolicy::exponential(Duration::from_secs(1), Duration::from_secs(3600));
        assert_eq!(policy.base_delay(200), Duration::from_secs(3600));

        let policy = BackoffPolicy::polynomial(Duration::from_secs(1), Duration::from_secs(3600))
            .with_degree(30);
        assert_eq!(policy.base_delay(u32::MAX), Duration::from_secs(3600));
    }

    #[test]
    fn jitter_only_shortens() {
        let policy =
            BackoffPolicy::constant(Duration::from_millis(1000)).with_jitter(0.5);
        for _ in 0..100 {
            let d = policy.delay(1);
            assert!(d <= Duration::from_millis(1000));
            assert!(d >= Duration::from_millis(500));
        }
    }

    #[test]
    fn zero_jitter_disables() {
        let policy = BackoffPolicy::constant(Duration::from_millis(100)).with_jitter(0.0);
        assert_eq!(policy.delay(1), Duration::from_millis(100));

        let policy = policy.with_jitter(0.3).without_jitter();
        assert_eq!(policy.delay(1), Duration::from_millis(100));
    }

    #[test]
    fn attempt_zero_is_treated_as_one() {
        let policy = BackoffPolicy::linear(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(policy.base_delay(0), Duration::from_millis(100));
    }
}
