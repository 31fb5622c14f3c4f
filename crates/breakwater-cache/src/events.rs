use std::time::Instant;

use breakwater_core::events::ResilienceEvent;

/// Events published by the cache provider, after the adapter mutation is
/// durable.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A read found a live entry.
    Found {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// A read found nothing (absent or expired).
    NotFound {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// A new entry was written.
    Added {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// A live entry's value was replaced.
    Updated {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// An entry was removed.
    Removed {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// A live numeric entry was incremented.
    Incremented {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        delta: i64,
    },
    /// The provider's namespace was cleared.
    Cleared {
        pattern_name: String,
        timestamp: Instant,
    },
    /// The storage adapter failed.
    UnexpectedError {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        message: String,
    },
}

impl ResilienceEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Found { .. } => "Found",
            CacheEvent::NotFound { .. } => "NotFound",
            CacheEvent::Added { .. } => "Added",
            CacheEvent::Updated { .. } => "Updated",
            CacheEvent::Removed { .. } => "Removed",
            CacheEvent::Incremented { .. } => "Incremented",
            CacheEvent::Cleared { .. } => "Cleared",
            CacheEvent::UnexpectedError { .. } => "UnexpectedError",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Found { timestamp, .. }
            | CacheEvent::NotFound { timestamp, .. }
            | CacheEvent::Added { timestamp, .. }
            | CacheEvent::Updated { timestamp, .. }
            | CacheEvent::Removed { timestamp, .. }
            | CacheEvent::Incremented { timestamp, .. }
            | CacheEvent::Cleared { timestamp, .. }
            | CacheEvent::UnexpectedError { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CacheEvent::Found { pattern_name, .. }
            | CacheEvent::NotFound { pattern_name, .. }
            | CacheEvent::Added { pattern_name, .. }
            | CacheEvent::Updated { pattern_name, .. }
            | CacheEvent::Removed { pattern_name, .. }
            | CacheEvent::Incremented { pattern_name, .. }
            | CacheEvent::Cleared { pattern_name, .. }
            | CacheEvent::UnexpectedError { pattern_name, .. } => pattern_name,
        }
    }
}
