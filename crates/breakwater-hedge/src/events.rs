use std::time::{Duration, Instant};

use breakwater_core::events::ResilienceEvent;

/// Events emitted by the hedging middleware.
#[derive(Debug, Clone)]
pub enum HedgeEvent {
    /// A candidate is about to be invoked.
    AttemptStarted {
        pattern_name: String,
        timestamp: Instant,
        candidate: String,
    },
    /// A candidate failed (returned an error, or a value the policy
    /// classified as a failure).
    AttemptFailed {
        pattern_name: String,
        timestamp: Instant,
        candidate: String,
    },
    /// A candidate produced the winning value.
    Succeeded {
        pattern_name: String,
        timestamp: Instant,
        candidate: String,
        duration: Duration,
    },
    /// Every candidate failed.
    AllFailed {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The parallel race ran out of wall-clock time.
    TimedOut {
        pattern_name: String,
        timestamp: Instant,
        wait_time: Duration,
    },
}

impl ResilienceEvent for HedgeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            HedgeEvent::AttemptStarted { .. } => "AttemptStarted",
            HedgeEvent::AttemptFailed { .. } => "AttemptFailed",
            HedgeEvent::Succeeded { .. } => "Succeeded",
            HedgeEvent::AllFailed { .. } => "AllFailed",
            HedgeEvent::TimedOut { .. } => "TimedOut",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            HedgeEvent::AttemptStarted { timestamp, .. }
            | HedgeEvent::AttemptFailed { timestamp, .. }
            | HedgeEvent::Succeeded { timestamp, .. }
            | HedgeEvent::AllFailed { timestamp, .. }
            | HedgeEvent::TimedOut { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            HedgeEvent::AttemptStarted { pattern_name, .. }
            | HedgeEvent::AttemptFailed { pattern_name, .. }
            | HedgeEvent::Succeeded { pattern_name, .. }
            | HedgeEvent::AllFailed { pattern_name, .. }
            | HedgeEvent::TimedOut { pattern_name, .. } => pattern_name,
        }
    }
}
