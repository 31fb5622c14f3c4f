//! Error types for the timeout middleware.

use std::fmt;
use std::time::Duration;

/// Error type returned by the timeout service.
#[derive(Debug)]
pub enum TimeoutError<E> {
    /// The wait time elapsed before the inner call completed. The inner
    /// computation has been asked to stop via the forwarded cancellation
    /// signal; no further value from it will be observed.
    Elapsed {
        /// The configured wait time.
        wait_time: Duration,
    },

    /// The inner service failed within the wait time.
    Inner(E),
}

impl<E> TimeoutError<E> {
    /// Returns `true` if the wait time elapsed.
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Self::Elapsed { .. })
    }

    /// Returns the inner error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Elapsed { .. } => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elapsed { wait_time } => {
                write!(f, "call exceeded the wait time of {wait_time:?}")
            }
            Self::Inner(e) => write!(f, "inner service error: {e}"),
        }
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for TimeoutError<E> {}
