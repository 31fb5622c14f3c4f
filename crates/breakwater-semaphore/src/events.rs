use std::time::Instant;

use breakwater_core::events::ResilienceEvent;

/// Events published by a semaphore provider, after the adapter mutation is
/// durable.
#[derive(Debug, Clone)]
pub enum SemaphoreEvent {
    /// A slot was claimed.
    Acquired {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        slot_id: String,
    },
    /// No free slot was available.
    LimitReached {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        slot_id: String,
    },
    /// A slot was released.
    Released {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        slot_id: String,
    },
    /// A release was refused (slot not held or expired).
    FailedRelease {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        slot_id: String,
    },
    /// The whole semaphore was removed.
    AllForceReleased {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        has_released: bool,
    },
    /// A slot's lease was extended.
    Refreshed {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        slot_id: String,
    },
    /// A refresh was refused (slot not held or expired).
    FailedRefresh {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        slot_id: String,
    },
    /// The storage adapter failed.
    UnexpectedError {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        slot_id: String,
        message: String,
    },
}

impl ResilienceEvent for SemaphoreEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SemaphoreEvent::Acquired { .. } => "Acquired",
            SemaphoreEvent::LimitReached { .. } => "LimitReached",
            SemaphoreEvent::Released { .. } => "Released",
            SemaphoreEvent::FailedRelease { .. } => "FailedRelease",
            SemaphoreEvent::AllForceReleased { .. } => "AllForceReleased",
            SemaphoreEvent::Refreshed { .. } => "Refreshed",
            SemaphoreEvent::FailedRefresh { .. } => "FailedRefresh",
            SemaphoreEvent::UnexpectedError { .. } => "UnexpectedError",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            SemaphoreEvent::Acquired { timestamp, .. }
            | SemaphoreEvent::LimitReached { timestamp, .. }
            | SemaphoreEvent::Released { timestamp, .. }
            | SemaphoreEvent::FailedRelease { timestamp, .. }
            | SemaphoreEvent::AllForceReleased { timestamp, .. }
            | SemaphoreEvent::Refreshed { timestamp, .. }
            | SemaphoreEvent::FailedRefresh { timestamp, .. }
            | SemaphoreEvent::UnexpectedError { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            SemaphoreEvent::Acquired { pattern_name, .. }
            | SemaphoreEvent::LimitReached { pattern_name, .. }
            | SemaphoreEvent::Released { pattern_name, .. }
            | SemaphoreEvent::FailedRelease { pattern_name, .. }
            | SemaphoreEvent::AllForceReleased { pattern_name, .. }
            | SemaphoreEvent::Refreshed { pattern_name, .. }
            | SemaphoreEvent::FailedRefresh { pattern_name, .. }
            | SemaphoreEvent::UnexpectedError { pattern_name, .. } => pattern_name,
        }
    }
}
