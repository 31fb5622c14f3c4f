use breakwater_core::error::StorageError;
use thiserror::Error;

/// Errors surfaced by the `*_or_fail` semaphore operations.
#[derive(Debug, Error)]
pub enum SemaphoreError {
    /// Every slot is taken.
    #[error("semaphore \"{key}\" has no free slot")]
    LimitReached { key: String },

    /// The slot is not held by this handle (or already expired), so the
    /// release was refused.
    #[error("semaphore \"{key}\" slot is not held by this handle; release refused")]
    UnownedRelease { key: String },

    /// The slot's lease already expired, so the refresh was refused.
    #[error("semaphore \"{key}\" slot expired; refresh refused")]
    ExpiredRefresh { key: String },

    /// The storage adapter failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_key() {
        let err = SemaphoreError::LimitReached {
            key: "uploads".to_string(),
        };
        assert_eq!(err.to_string(), "semaphore \"uploads\" has no free slot");
    }
}
