use breakwater_core::error::StorageError;
use thiserror::Error;

/// Errors surfaced by cache adapters and the cache provider.
#[derive(Debug, Error)]
pub enum CacheError {
    /// `get_or_fail` found no live entry.
    #[error("cache key \"{key}\" not found")]
    KeyNotFound { key: String },

    /// `increment` hit a live entry holding a non-numeric value.
    #[error("cache key \"{key}\" holds a non-numeric value; increment refused")]
    Type { key: String },

    /// A value failed to serialize on the way into the adapter.
    #[error("cache value for key \"{key}\" failed to serialize")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value failed to deserialize on the way out.
    #[error("cache value for key \"{key}\" failed to deserialize")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The storage adapter failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CacheError {
    /// Returns `true` for the non-numeric increment error.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::Type { .. })
    }
}
