use std::time::Instant;

use breakwater_core::events::ResilienceEvent;

/// Events published by a lock provider, after the adapter mutation is
/// durable.
#[derive(Debug, Clone)]
pub enum LockEvent {
    /// The lease was taken.
    Acquired {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        owner: String,
    },
    /// Someone else holds the lease.
    NotAvailable {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        owner: String,
    },
    /// The lease was released.
    Released {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        owner: String,
    },
    /// A release was refused (not owner or expired).
    FailedRelease {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        owner: String,
    },
    /// Any lease on the key was removed unconditionally.
    ForceReleased {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// The lease was extended.
    Refreshed {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        owner: String,
    },
    /// A refresh was refused (not owner or expired).
    FailedRefresh {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        owner: String,
    },
    /// The storage adapter failed.
    UnexpectedError {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        owner: String,
        message: String,
    },
}

impl ResilienceEvent for LockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LockEvent::Acquired { .. } => "Acquired",
            LockEvent::NotAvailable { .. } => "NotAvailable",
            LockEvent::Released { .. } => "Released",
            LockEvent::FailedRelease { .. } => "FailedRelease",
            LockEvent::ForceReleased { .. } => "ForceReleased",
            LockEvent::Refreshed { .. } => "Refreshed",
            LockEvent::FailedRefresh { .. } => "FailedRefresh",
            LockEvent::UnexpectedError { .. } => "UnexpectedError",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            LockEvent::Acquired { timestamp, .. }
            | LockEvent::NotAvailable { timestamp, .. }
            | LockEvent::Released { timestamp, .. }
            | LockEvent::FailedRelease { timestamp, .. }
            | LockEvent::ForceReleased { timestamp, .. }
            | LockEvent::Refreshed { timestamp, .. }
            | LockEvent::FailedRefresh { timestamp, .. }
            | LockEvent::UnexpectedError { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            LockEvent::Acquired { pattern_name, .. }
            | LockEvent::NotAvailable { pattern_name, .. }
            | LockEvent::Released { pattern_name, .. }
            | LockEvent::FailedRelease { pattern_name, .. }
            | LockEvent::ForceReleased { pattern_name, .. }
            | LockEvent::Refreshed { pattern_name, .. }
            | LockEvent::FailedRefresh { pattern_name, .. }
            | LockEvent::UnexpectedError { pattern_name, .. } => pattern_name,
        }
    }
}
