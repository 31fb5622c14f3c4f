//! Persisted breaker state and the pure state manager.

use std::time::SystemTime;

use breakwater_core::backoff::BackoffPolicy;
use serde::{Deserialize, Serialize};

use crate::policy::{CircuitBreakerPolicy, ClosedOutcome, HalfOpenOutcome, Phase};

/// The persisted state of one breaker key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CircuitState<M> {
    /// Calls are allowed; outcomes are tracked.
    Closed { metrics: M },
    /// Calls are rejected until `reopen_at`.
    Open {
        opened_at: SystemTime,
        attempt: u32,
        reopen_at: SystemTime,
    },
    /// Trial calls are admitted. `attempt` carries the open/half-open cycle
    /// count so a failed trial backs off further.
    HalfOpen { metrics: M, attempt: u32 },
    /// Manually forced open until reset.
    Isolated,
}

/// A breaker state's name, as reported to callers and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateName {
    Closed,
    Open,
    HalfOpen,
    Isolated,
}

impl StateName {
    /// Returns `true` if calls are rejected in this state.
    pub fn rejects_calls(&self) -> bool {
        matches!(self, StateName::Open | StateName::Isolated)
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StateName::Closed => "Closed",
            StateName::Open => "Open",
            StateName::HalfOpen => "HalfOpen",
            StateName::Isolated => "Isolated",
        };
        f.write_str(name)
    }
}

impl<M> CircuitState<M> {
    /// This state's name.
    pub fn name(&self) -> StateName {
        match self {
            CircuitState::Closed { .. } => StateName::Closed,
            CircuitState::Open { .. } => StateName::Open,
            CircuitState::HalfOpen { .. } => StateName::HalfOpen,
            CircuitState::Isolated => StateName::Isolated,
        }
    }
}

/// Advances a state along the transition table.
///
/// - `Closed`: opens when the policy says so, with `reopen_at` one backoff
///   step away.
/// - `Open`: becomes half-open once `now >= reopen_at`.
/// - `HalfOpen`: closes or reopens per the policy; reopening increments the
///   attempt and backs off further.
/// - `Isolated`: only `reset` leaves this state.
pub fn update_state<P: CircuitBreakerPolicy>(
    state: CircuitState<P::Metrics>,
    policy: &P,
    backoff: &BackoffPolicy,
    now: SystemTime,
) -> CircuitState<P::Metrics> {
    match state {
        CircuitState::Closed { metrics } => match policy.when_closed(&metrics, now) {
            ClosedOutcome::ToOpen => CircuitState::Open {
                opened_at: now,
                attempt: 1,
                reopen_at: now + backoff.delay(1),
            },
            ClosedOutcome::Stay => CircuitState::Closed { metrics },
        },
        CircuitState::Open {
            opened_at,
            attempt,
            reopen_at,
        } => {
            if now >= reopen_at {
                CircuitState::HalfOpen {
                    metrics: policy.initial_metrics(),
                    attempt,
                }
            } else {
                CircuitState::Open {
                    opened_at,
                    attempt,
                    reopen_at,
                }
            }
        }
        CircuitState::HalfOpen { metrics, attempt } => {
            match policy.when_half_opened(&metrics, now) {
                HalfOpenOutcome::ToClosed => CircuitState::Closed {
                    metrics: policy.initial_metrics(),
                },
                HalfOpenOutcome::ToOpen => {
                    let attempt = attempt + 1;
                    CircuitState::Open {
                        opened_at: now,
                        attempt,
                        reopen_at: now + backoff.delay(attempt),
                    }
                }
                HalfOpenOutcome::Stay => CircuitState::HalfOpen { metrics, attempt },
            }
        }
        CircuitState::Isolated => CircuitState::Isolated,
    }
}

/// Records a failure. Only `Closed` and `HalfOpen` mutate their metrics.
pub fn track_failure<P: CircuitBreakerPolicy>(
    state: CircuitState<P::Metrics>,
    policy: &P,
    now: SystemTime,
) -> CircuitState<P::Metrics> {
    match state {
        CircuitState::Closed { mut metrics } => {
            policy.track_failure(&mut metrics, Phase::Closed, now);
            CircuitState::Closed { metrics }
        }
        CircuitState::HalfOpen {
            mut metrics,
            attempt,
        } => {
            policy.track_failure(&mut metrics, Phase::HalfOpen, now);
            CircuitState::HalfOpen { metrics, attempt }
        }
        other => other,
    }
}

/// Records a success. Only `Closed` and `HalfOpen` mutate their metrics.
pub fn track_success<P: CircuitBreakerPolicy>(
    state: CircuitState<P::Metrics>,
    policy: &P,
    now: SystemTime,
) -> CircuitState<P::Metrics> {
    match state {
        CircuitState::Closed { mut metrics } => {
            policy.track_success(&mut metrics, Phase::Closed, now);
            CircuitState::Closed { metrics }
        }
        CircuitState::HalfOpen {
            mut metrics,
            attempt,
        } => {
            policy.track_success(&mut metrics, Phase::HalfOpen, now);
            CircuitState::HalfOpen { metrics, attempt }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ConsecutivePolicy;
    use std::time::Duration;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn backoff() -> BackoffPolicy {
        BackoffPolicy::constant(Duration::from_secs(30))
    }

    #[test]
    fn closed_opens_when_policy_trips() {
        let policy = ConsecutivePolicy::new(2);
        let mut state = CircuitState::Closed {
            metrics: policy.initial_metrics(),
        };
        state = track_failure(state, &policy, now());
        state = track_failure(state, &policy, now());
        let state = update_state(state, &policy, &backoff(), now());

        match state {
            CircuitState::Open {
                attempt, reopen_at, ..
            } => {
                assert_eq!(attempt, 1);
                assert_eq!(reopen_at, now() + Duration::from_secs(30));
            }
            other => panic!("expected open, got {other:?}"),
        }
    }

    #[test]
    fn open_half_opens_only_after_reopen_at() {
        let policy = ConsecutivePolicy::new(2);
        let state = CircuitState::Open {
            opened_at: now(),
            attempt: 1,
            reopen_at: now() + Duration::from_secs(30),
        };

        let early = update_state(state.clone(), &policy, &backoff(), now());
        assert_eq!(early.name(), StateName::Open);

        let late = update_state(state, &policy, &backoff(), now() + Duration::from_secs(30));
        assert_eq!(late.name(), StateName::HalfOpen);
    }

    #[test]
    fn half_open_failure_reopens_with_longer_backoff() {
        let policy = ConsecutivePolicy::new(2);
        let backoff =
            BackoffPolicy::exponential(Duration::from_secs(10), Duration::from_secs(600));

        let state = CircuitState::HalfOpen {
            metrics: policy.initial_metrics(),
            attempt: 1,
        };
        let state = track_failure(state, &policy, now());
        let state = update_state(state, &policy, &backoff, now());

        match state {
            CircuitState::Open {
                attempt, reopen_at, ..
            } => {
                assert_eq!(attempt, 2);
                assert_eq!(reopen_at, now() + Duration::from_secs(20));
            }
            other => panic!("expected open, got {other:?}"),
        }
    }

    #[test]
    fn half_open_closes_after_enough_successes() {
        let policy = ConsecutivePolicy::new(2);
        let mut state = CircuitState::HalfOpen {
            metrics: policy.initial_metrics(),
            attempt: 3,
        };
        state = track_success(state, &policy, now());
        state = track_success(state, &policy, now());
        let state = update_state(state, &policy, &backoff(), now());
        assert_eq!(state.name(), StateName::Closed);
    }

    #[test]
    fn isolated_ignores_updates_and_tracking() {
        let policy = ConsecutivePolicy::new(1);
        let state: CircuitState<_> = CircuitState::Isolated;
        let state = track_failure(state, &policy, now());
        let state = track_success(state, &policy, now());
        let state = update_state(state, &policy, &backoff(), now());
        assert_eq!(state.name(), StateName::Isolated);
    }

    #[test]
    fn state_serializes_round_trip() {
        let policy = ConsecutivePolicy::new(2);
        let state = CircuitState::Open {
            opened_at: now(),
            attempt: 2,
            reopen_at: now() + Duration::from_secs(60),
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: CircuitState<<ConsecutivePolicy as CircuitBreakerPolicy>::Metrics> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        let _ = policy;
    }
}
