use std::time::Instant;

use breakwater_core::events::ResilienceEvent;

use crate::adapter::UnavailableReason;
use crate::error::Side;

/// Events published by a shared lock provider, after the adapter mutation
/// is durable.
#[derive(Debug, Clone)]
pub enum SharedLockEvent {
    /// A lease was taken on one side.
    Acquired {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        side: Side,
        holder: String,
    },
    /// An acquisition was refused.
    Unavailable {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        side: Side,
        reason: UnavailableReason,
    },
    /// A lease was released on one side.
    Released {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        side: Side,
        holder: String,
    },
    /// A release was refused.
    FailedRelease {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        side: Side,
        holder: String,
    },
    /// A lease was extended on one side.
    Refreshed {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        side: Side,
        holder: String,
    },
    /// A refresh was refused.
    FailedRefresh {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        side: Side,
        holder: String,
    },
    /// Both sides were cleared unconditionally.
    ForceReleased {
        pattern_name: String,
        timestamp: Instant,
        key: String,
    },
    /// The storage adapter failed.
    UnexpectedError {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        message: String,
    },
}

impl ResilienceEvent for SharedLockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SharedLockEvent::Acquired { .. } => "Acquired",
            SharedLockEvent::Unavailable { .. } => "Unavailable",
            SharedLockEvent::Released { .. } => "Released",
            SharedLockEvent::FailedRelease { .. } => "FailedRelease",
            SharedLockEvent::Refreshed { .. } => "Refreshed",
            SharedLockEvent::FailedRefresh { .. } => "FailedRefresh",
            SharedLockEvent::ForceReleased { .. } => "ForceReleased",
            SharedLockEvent::UnexpectedError { .. } => "UnexpectedError",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            SharedLockEvent::Acquired { timestamp, .. }
            | SharedLockEvent::Unavailable { timestamp, .. }
            | SharedLockEvent::Released { timestamp, .. }
            | SharedLockEvent::FailedRelease { timestamp, .. }
            | SharedLockEvent::Refreshed { timestamp, .. }
            | SharedLockEvent::FailedRefresh { timestamp, .. }
            | SharedLockEvent::ForceReleased { timestamp, .. }
            | SharedLockEvent::UnexpectedError { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            SharedLockEvent::Acquired { pattern_name, .. }
            | SharedLockEvent::Unavailable { pattern_name, .. }
            | SharedLockEvent::Released { pattern_name, .. }
            | SharedLockEvent::FailedRelease { pattern_name, .. }
            | SharedLockEvent::Refreshed { pattern_name, .. }
            | SharedLockEvent::FailedRefresh { pattern_name, .. }
            | SharedLockEvent::ForceReleased { pattern_name, .. }
            | SharedLockEvent::UnexpectedError { pattern_name, .. } => pattern_name,
        }
    }
}
