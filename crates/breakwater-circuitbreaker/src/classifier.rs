//! Failure classification for tracked call outcomes.

/// Decides whether a call outcome counts as a failure.
pub trait FailureClassifier<Res, E>: Send + Sync {
    /// Returns `true` if the result should be recorded as a failure.
    fn is_failure(&self, result: &Result<Res, E>) -> bool;
}

/// Default classification: every error is a failure, every success is not.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl<Res, E> FailureClassifier<Res, E> for DefaultClassifier {
    fn is_failure(&self, result: &Result<Res, E>) -> bool {
        result.is_err()
    }
}

/// Classification by a user-supplied function, e.g. to exempt timeouts or
/// count degraded responses as failures.
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: F,
}

impl<F> FnClassifier<F> {
    /// Creates a classifier from a function over the call result.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<Res, E, F> FailureClassifier<Res, E> for FnClassifier<F>
where
    F: Fn(&Result<Res, E>) -> bool + Send + Sync,
{
    fn is_failure(&self, result: &Result<Res, E>) -> bool {
        (self.f)(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classifier_counts_errors_only() {
        let ok: Result<u32, &str> = Ok(1);
        let err: Result<u32, &str> = Err("boom");
        assert!(!DefaultClassifier.is_failure(&ok));
        assert!(DefaultClassifier.is_failure(&err));
    }

    #[test]
    fn fn_classifier_applies_custom_logic() {
        let classifier = FnClassifier::new(|result: &Result<u32, &str>| {
            matches!(result, Ok(0) | Err(_))
        });
        assert!(classifier.is_failure(&Ok(0)));
        assert!(!classifier.is_failure(&Ok(7)));
        assert!(classifier.is_failure(&Err("x")));
    }
}
