use std::time::{Duration, Instant};

use breakwater_core::events::ResilienceEvent;

/// Events emitted by the bulkhead middleware.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A call was rejected because the waiting queue is at capacity.
    Rejected {
        pattern_name: String,
        timestamp: Instant,
        max_capacity: usize,
    },
    /// A call left the queue and is now being processed.
    Processing {
        pattern_name: String,
        timestamp: Instant,
        concurrent_calls: usize,
    },
    /// A call finished successfully.
    Finished {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// A call finished with an error.
    Failed {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// A queued call was cancelled before reaching the inner service.
    Cancelled {
        pattern_name: String,
        timestamp: Instant,
    },
}

impl ResilienceEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkheadEvent::Rejected { .. } => "Rejected",
            BulkheadEvent::Processing { .. } => "Processing",
            BulkheadEvent::Finished { .. } => "Finished",
            BulkheadEvent::Failed { .. } => "Failed",
            BulkheadEvent::Cancelled { .. } => "Cancelled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BulkheadEvent::Rejected { timestamp, .. }
            | BulkheadEvent::Processing { timestamp, .. }
            | BulkheadEvent::Finished { timestamp, .. }
            | BulkheadEvent::Failed { timestamp, .. }
            | BulkheadEvent::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            BulkheadEvent::Rejected { pattern_name, .. }
            | BulkheadEvent::Processing { pattern_name, .. }
            | BulkheadEvent::Finished { pattern_name, .. }
            | BulkheadEvent::Failed { pattern_name, .. }
            | BulkheadEvent::Cancelled { pattern_name, .. } => pattern_name,
        }
    }
}
