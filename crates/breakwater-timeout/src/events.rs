use std::time::{Duration, Instant};

use breakwater_core::events::ResilienceEvent;

/// Events emitted by the timeout middleware.
#[derive(Debug, Clone)]
pub enum TimeoutEvent {
    /// The inner call completed within the wait time.
    Completed {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The inner call failed within the wait time.
    Failed {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The wait time elapsed; the inner call was asked to stop.
    TimedOut {
        pattern_name: String,
        timestamp: Instant,
        wait_time: Duration,
    },
}

impl ResilienceEvent for TimeoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeoutEvent::Completed { .. } => "Completed",
            TimeoutEvent::Failed { .. } => "Failed",
            TimeoutEvent::TimedOut { .. } => "TimedOut",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeoutEvent::Completed { timestamp, .. }
            | TimeoutEvent::Failed { timestamp, .. }
            | TimeoutEvent::TimedOut { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TimeoutEvent::Completed { pattern_name, .. }
            | TimeoutEvent::Failed { pattern_name, .. }
            | TimeoutEvent::TimedOut { pattern_name, .. } => pattern_name,
        }
    }
}
