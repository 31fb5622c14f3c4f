//! Error types for the retry middleware.

use std::fmt;

/// Error type returned by the retry service.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed. Carries the error from each attempt, in order.
    Exhausted {
        /// Number of attempts made.
        attempts: usize,
        /// The error each attempt produced.
        errors: Vec<E>,
    },

    /// The error policy classified the error as not retryable; it is
    /// surfaced unchanged without further attempts.
    Rejected(E),

    /// Cancellation was requested between attempts.
    Cancelled,
}

impl<E> RetryError<E> {
    /// Returns `true` if the attempts were exhausted.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns `true` if the call was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The last attempt's error, if any attempt ran.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { errors, .. } => errors.last(),
            Self::Rejected(e) => Some(e),
            Self::Cancelled => None,
        }
    }

    /// Consumes the error, returning all collected attempt errors.
    pub fn into_errors(self) -> Vec<E> {
        match self {
            Self::Exhausted { errors, .. } => errors,
            Self::Rejected(e) => vec![e],
            Self::Cancelled => Vec::new(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, errors } => {
                write!(f, "retry attempts exhausted after {attempts} attempts")?;
                if let Some(last) = errors.last() {
                    write!(f, "; last error: {last}")?;
                }
                Ok(())
            }
            Self::Rejected(e) => write!(f, "error not retryable: {e}"),
            Self::Cancelled => write!(f, "retry cancelled"),
        }
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for RetryError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_reports_attempts_and_last_error() {
        let err: RetryError<&str> = RetryError::Exhausted {
            attempts: 3,
            errors: vec!["a", "b", "c"],
        };
        assert!(err.is_exhausted());
        assert_eq!(err.last_error(), Some(&"c"));
        assert_eq!(
            err.to_string(),
            "retry attempts exhausted after 3 attempts; last error: c"
        );
        assert_eq!(err.into_errors(), vec!["a", "b", "c"]);
    }

    #[test]
    fn rejected_carries_the_original() {
        let err: RetryError<&str> = RetryError::Rejected("fatal");
        assert!(!err.is_exhausted());
        assert_eq!(err.into_errors(), vec!["fatal"]);
    }
}
