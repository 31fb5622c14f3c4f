use std::time::Instant;

use breakwater_core::events::ResilienceEvent;

use crate::state::StateName;

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The breaker moved between states.
    StateTransition {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        from: StateName,
        to: StateName,
    },
    /// A call was admitted.
    CallPermitted {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        state: StateName,
    },
    /// A call was rejected by an open or isolated breaker.
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        state: StateName,
    },
    /// A failure outcome was recorded.
    FailureRecorded {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        state: StateName,
    },
    /// A success outcome was recorded.
    SuccessRecorded {
        pattern_name: String,
        timestamp: Instant,
        key: String,
        state: StateName,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "StateTransition",
            CircuitBreakerEvent::CallPermitted { .. } => "CallPermitted",
            CircuitBreakerEvent::CallRejected { .. } => "CallRejected",
            CircuitBreakerEvent::FailureRecorded { .. } => "FailureRecorded",
            CircuitBreakerEvent::SuccessRecorded { .. } => "SuccessRecorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { pattern_name, .. }
            | CircuitBreakerEvent::CallPermitted { pattern_name, .. }
            | CircuitBreakerEvent::CallRejected { pattern_name, .. }
            | CircuitBreakerEvent::FailureRecorded { pattern_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { pattern_name, .. } => pattern_name,
        }
    }
}
