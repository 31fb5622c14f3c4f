use breakwater_core::error::StorageError;
use thiserror::Error;

/// Errors returned by the circuit breaker.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The breaker is open; calls are rejected until the reopen time.
    #[error("circuit breaker \"{key}\" is open; call not permitted")]
    Open { key: String },

    /// The breaker was manually isolated; only a reset admits calls again.
    #[error("circuit breaker \"{key}\" is isolated; call not permitted")]
    Isolated { key: String },

    /// The storage adapter failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An error returned by the inner service.
    #[error("inner service error: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns `true` if the breaker rejected the call.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::Isolated { .. })
    }

    /// Returns the inner error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_error_names_the_key() {
        let err: CircuitBreakerError<String> = CircuitBreakerError::Open {
            key: "payments".to_string(),
        };
        assert!(err.is_rejected());
        assert_eq!(
            err.to_string(),
            "circuit breaker \"payments\" is open; call not permitted"
        );
    }
}
