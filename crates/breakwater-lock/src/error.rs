use breakwater_core::error::StorageError;
use thiserror::Error;

/// Errors surfaced by the `*_or_fail` lock operations.
///
/// The plain operations report the same outcomes as booleans; storage
/// failures propagate unchanged in both forms.
#[derive(Debug, Error)]
pub enum LockError {
    /// Someone else holds a live lease on the key.
    #[error("lock \"{key}\" is already acquired by another owner")]
    KeyAlreadyAcquired { key: String },

    /// The lease is not held by this owner (or already expired), so the
    /// release was refused.
    #[error("lock \"{key}\" is not held by this owner; release refused")]
    UnownedRelease { key: String },

    /// The lease is not held by this owner (or already expired), so the
    /// refresh was refused.
    #[error("lock \"{key}\" is not held by this owner; refresh refused")]
    UnownedRefresh { key: String },

    /// The storage adapter failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
