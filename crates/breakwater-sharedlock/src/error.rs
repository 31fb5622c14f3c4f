use breakwater_core::error::StorageError;
use thiserror::Error;

use crate::adapter::UnavailableReason;

/// Which side of the shared lock an operation acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Writer,
    Reader,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Side::Writer => "writer",
            Side::Reader => "reader",
        })
    }
}

/// Errors surfaced by the `*_or_fail` shared lock operations.
#[derive(Debug, Error)]
pub enum SharedLockError {
    /// The acquisition was refused; the reason discriminates writer-held,
    /// readers-held and reader-limit cases.
    #[error("shared lock \"{key}\" is unavailable: {reason}")]
    Unavailable {
        key: String,
        reason: UnavailableReason,
    },

    /// The lease is not held by this handle, so the release was refused.
    #[error("shared lock \"{key}\" {side} lease is not held by this handle; release refused")]
    UnownedRelease { key: String, side: Side },

    /// The lease is not held by this handle (or expired), so the refresh
    /// was refused.
    #[error("shared lock \"{key}\" {side} lease is not held by this handle; refresh refused")]
    UnownedRefresh { key: String, side: Side },

    /// The storage adapter failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
