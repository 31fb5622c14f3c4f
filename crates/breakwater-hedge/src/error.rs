//! Error types for the hedging middleware.

use std::fmt;

/// Error type returned by the hedging service.
#[derive(Debug)]
pub enum HedgeError<E> {
    /// Sequential hedging exhausted every candidate; carries the last
    /// collected error.
    Inner(E),

    /// Parallel hedging: every candidate failed within the wait time.
    /// Carries each candidate's name and error.
    AllFailed {
        errors: Vec<(String, E)>,
    },

    /// Parallel hedging: the wait time expired before any candidate
    /// succeeded. Carries the errors accumulated so far.
    TimedOut {
        errors: Vec<(String, E)>,
    },

    /// Cancellation was observed between candidates.
    Cancelled,
}

impl<E> HedgeError<E> {
    /// Returns `true` if every candidate failed.
    pub fn is_all_failed(&self) -> bool {
        matches!(self, Self::AllFailed { .. })
    }

    /// Returns `true` if the race timed out.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// The collected candidate errors, without names.
    pub fn into_errors(self) -> Vec<E> {
        match self {
            Self::Inner(e) => vec![e],
            Self::AllFailed { errors } | Self::TimedOut { errors } => {
                errors.into_iter().map(|(_, e)| e).collect()
            }
            Self::Cancelled => Vec::new(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for HedgeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner(e) => write!(f, "all hedging candidates failed; last error: {e}"),
            Self::AllFailed { errors } => {
                write!(f, "all {} hedging candidates failed", errors.len())
            }
            Self::TimedOut { errors } => write!(
                f,
                "hedging wait time expired with {} failed candidates",
                errors.len()
            ),
            Self::Cancelled => write!(f, "hedging cancelled"),
        }
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for HedgeError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_failed_keeps_named_errors() {
        let err: HedgeError<&str> = HedgeError::AllFailed {
            errors: vec![
                ("__primary".to_string(), "a"),
                ("fallback-1".to_string(), "b"),
            ],
        };
        assert!(err.is_all_failed());
        assert_eq!(err.to_string(), "all 2 hedging candidates failed");
        assert_eq!(err.into_errors(), vec!["a", "b"]);
    }
}
