//! Error types for the bulkhead middleware.

use std::fmt;

/// Error type returned by the bulkhead service.
#[derive(Debug)]
pub enum BulkheadError<E> {
    /// The waiting queue is at capacity; the call was rejected without being
    /// enqueued.
    CapacityFull {
        /// The configured queue capacity.
        max_capacity: usize,
    },

    /// The call was cancelled while waiting in the queue; the inner service
    /// was never invoked.
    Cancelled,

    /// The inner service failed.
    Inner(E),
}

impl<E> BulkheadError<E> {
    /// Returns `true` if the queue was full.
    pub fn is_capacity_full(&self) -> bool {
        matches!(self, Self::CapacityFull { .. })
    }

    /// Returns the inner error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for BulkheadError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityFull { max_capacity } => {
                write!(f, "bulkhead queue is full (capacity {max_capacity})")
            }
            Self::Cancelled => write!(f, "call cancelled while queued"),
            Self::Inner(e) => write!(f, "inner service error: {e}"),
        }
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for BulkheadError<E> {}
