//! Shared error types.

use thiserror::Error;

/// An opaque storage adapter failure (I/O, connection, serialization at the
/// storage edge).
///
/// Providers propagate these unchanged; expected contract outcomes (key
/// absent, not owner, expired) are reported as booleans or options instead.
#[derive(Debug, Error)]
#[error("storage adapter failure: {message}")]
pub struct StorageError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Creates a storage error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a storage error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
