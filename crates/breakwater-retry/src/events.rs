use std::time::{Duration, Instant};

use breakwater_core::events::ResilienceEvent;

/// Events emitted by the retry middleware.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt is about to be made (including the first).
    Attempt {
        pattern_name: String,
        timestamp: Instant,
        attempt: usize,
    },
    /// A failed attempt will be retried after the given delay.
    Delay {
        pattern_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    /// The operation succeeded, possibly after retries.
    Success {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// Every attempt failed.
    Exhausted {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// An error occurred but the error policy rejected retrying it.
    IgnoredError {
        pattern_name: String,
        timestamp: Instant,
    },
    /// Cancellation was observed between attempts.
    Cancelled {
        pattern_name: String,
        timestamp: Instant,
        attempt: usize,
    },
}

impl ResilienceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Attempt { .. } => "Attempt",
            RetryEvent::Delay { .. } => "Delay",
            RetryEvent::Success { .. } => "Success",
            RetryEvent::Exhausted { .. } => "Exhausted",
            RetryEvent::IgnoredError { .. } => "IgnoredError",
            RetryEvent::Cancelled { .. } => "Cancelled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Attempt { timestamp, .. }
            | RetryEvent::Delay { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::IgnoredError { timestamp, .. }
            | RetryEvent::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::Attempt { pattern_name, .. }
            | RetryEvent::Delay { pattern_name, .. }
            | RetryEvent::Success { pattern_name, .. }
            | RetryEvent::Exhausted { pattern_name, .. }
            | RetryEvent::IgnoredError { pattern_name, .. }
            | RetryEvent::Cancelled { pattern_name, .. } => pattern_name,
        }
    }
}
