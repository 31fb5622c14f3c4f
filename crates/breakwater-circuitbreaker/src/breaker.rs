//! The runtime breaker: storage transactions around the pure state manager.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use breakwater_core::backoff::BackoffPolicy;
use breakwater_core::error::StorageError;
use breakwater_core::events::EventListeners;

use crate::events::CircuitBreakerEvent;
use crate::policy::CircuitBreakerPolicy;
use crate::state::{self, CircuitState, StateName};
use crate::storage::CircuitBreakerStorage;

/// A completed state evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StateName,
    pub to: StateName,
}

/// Keyed circuit breaker over a storage adapter.
///
/// Every mutation runs as one storage transaction, so concurrent calls on the
/// same key serialize and no update is lost. Events are emitted only after
/// the mutation is durable.
pub struct CircuitBreakerAdapter<P: CircuitBreakerPolicy> {
    policy: Arc<P>,
    storage: Arc<dyn CircuitBreakerStorage<P::Metrics>>,
    backoff: BackoffPolicy,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl<P: CircuitBreakerPolicy> CircuitBreakerAdapter<P> {
    /// Creates an adapter from its parts. Usually constructed through the
    /// layer builder.
    pub fn new(
        policy: P,
        storage: Arc<dyn CircuitBreakerStorage<P::Metrics>>,
        backoff: BackoffPolicy,
        event_listeners: EventListeners<CircuitBreakerEvent>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            storage,
            backoff,
            event_listeners,
            name: name.into(),
        }
    }

    /// The current state name for `key`. Missing records read as `Closed`.
    pub async fn state_of(&self, key: &str) -> Result<StateName, StorageError> {
        Ok(self
            .storage
            .find(key)
            .await?
            .map(|state| state.name())
            .unwrap_or(StateName::Closed))
    }

    /// Advances the state along the transition table and reports the
    /// transition.
    pub async fn update_state(&self, key: &str) -> Result<Transition, StorageError> {
        let policy = Arc::clone(&self.policy);
        let backoff = self.backoff;
        let now = SystemTime::now();

        let (previous, next) = self
            .storage
            .update(
                key,
                Box::new(move |current| {
                    let current = current.unwrap_or_else(|| CircuitState::Closed {
                        metrics: policy.initial_metrics(),
                    });
                    state::update_state(current, policy.as_ref(), &backoff, now)
                }),
            )
            .await?;

        let transition = Transition {
            from: previous.map(|s| s.name()).unwrap_or(StateName::Closed),
            to: next.name(),
        };
        self.emit_transition(key, transition);
        Ok(transition)
    }

    /// Records a failed call outcome.
    pub async fn track_failure(&self, key: &str) -> Result<(), StorageError> {
        let policy = Arc::clone(&self.policy);
        let now = SystemTime::now();

        let (_, next) = self
            .storage
            .update(
                key,
                Box::new(move |current| {
                    let current = current.unwrap_or_else(|| CircuitState::Closed {
                        metrics: policy.initial_metrics(),
                    });
                    state::track_failure(current, policy.as_ref(), now)
                }),
            )
            .await?;

        self.event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
                state: next.name(),
            });

        #[cfg(feature = "metrics")]
        metrics::counter!("circuitbreaker_calls_total", "circuitbreaker" => self.name.clone(), "outcome" => "failure")
            .increment(1);

        Ok(())
    }

    /// Records a successful call outcome.
    pub async fn track_success(&self, key: &str) -> Result<(), StorageError> {
        let policy = Arc::clone(&self.policy);
        let now = SystemTime::now();

        let (_, next) = self
            .storage
            .update(
                key,
                Box::new(move |current| {
                    let current = current.unwrap_or_else(|| CircuitState::Closed {
                        metrics: policy.initial_metrics(),
                    });
                    state::track_success(current, policy.as_ref(), now)
                }),
            )
            .await?;

        self.event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
                state: next.name(),
            });

        #[cfg(feature = "metrics")]
        metrics::counter!("circuitbreaker_calls_total", "circuitbreaker" => self.name.clone(), "outcome" => "success")
            .increment(1);

        Ok(())
    }

    /// Removes the record for `key`, returning the breaker to `Closed`.
    pub async fn reset(&self, key: &str) -> Result<(), StorageError> {
        let previous = self.storage.find(key).await?;
        self.storage.remove(key).await?;
        if let Some(previous) = previous {
            self.emit_transition(
                key,
                Transition {
                    from: previous.name(),
                    to: StateName::Closed,
                },
            );
        }
        Ok(())
    }

    /// Forces the breaker open until `reset`.
    pub async fn isolate(&self, key: &str) -> Result<(), StorageError> {
        let (previous, next) = self
            .storage
            .update(key, Box::new(|_| CircuitState::Isolated))
            .await?;
        self.emit_transition(
            key,
            Transition {
                from: previous.map(|s| s.name()).unwrap_or(StateName::Closed),
                to: next.name(),
            },
        );
        Ok(())
    }

    pub(crate) fn emit_permitted(&self, key: &str, state: StateName) {
        self.event_listeners
            .emit(&CircuitBreakerEvent::CallPermitted {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
                state,
            });
    }

    pub(crate) fn emit_rejected(&self, key: &str, state: StateName) {
        self.event_listeners
            .emit(&CircuitBreakerEvent::CallRejected {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
                state,
            });

        #[cfg(feature = "metrics")]
        metrics::counter!("circuitbreaker_calls_rejected_total", "circuitbreaker" => self.name.clone())
            .increment(1);
    }

    fn emit_transition(&self, key: &str, transition: Transition) {
        if transition.from == transition.to {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            circuitbreaker = %self.name,
            key,
            from = %transition.from,
            to = %transition.to,
            "circuit state transition"
        );

        #[cfg(feature = "metrics")]
        metrics::counter!(
            "circuitbreaker_transitions_total",
            "circuitbreaker" => self.name.clone(),
            "from" => transition.from.to_string(),
            "to" => transition.to.to_string()
        )
        .increment(1);

        self.event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
                from: transition.from,
                to: transition.to,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ConsecutivePolicy;
    use crate::storage::MemoryCircuitBreakerStorage;
    use std::time::Duration;

    fn adapter(failure_threshold: u32) -> CircuitBreakerAdapter<ConsecutivePolicy> {
        CircuitBreakerAdapter::new(
            ConsecutivePolicy::new(failure_threshold),
            Arc::new(MemoryCircuitBreakerStorage::new()),
            BackoffPolicy::constant(Duration::from_millis(40)),
            EventListeners::new(),
            "test-breaker",
        )
    }

    #[tokio::test]
    async fn missing_key_reads_closed() {
        let breaker = adapter(3);
        assert_eq!(breaker.state_of("absent").await.unwrap(), StateName::Closed);
    }

    #[tokio::test]
    async fn failures_open_and_time_half_opens() {
        let breaker = adapter(2);

        breaker.track_failure("svc").await.unwrap();
        breaker.track_failure("svc").await.unwrap();
        let transition = breaker.update_state("svc").await.unwrap();
        assert_eq!(transition.to, StateName::Open);

        // Before the reopen time the breaker stays open.
        let transition = breaker.update_state("svc").await.unwrap();
        assert_eq!(transition.to, StateName::Open);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let transition = breaker.update_state("svc").await.unwrap();
        assert_eq!(transition.from, StateName::Open);
        assert_eq!(transition.to, StateName::HalfOpen);
    }

    #[tokio::test]
    async fn half_open_successes_close() {
        let breaker = adapter(2);

        breaker.track_failure("svc").await.unwrap();
        breaker.track_failure("svc").await.unwrap();
        breaker.update_state("svc").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        breaker.update_state("svc").await.unwrap();

        breaker.track_success("svc").await.unwrap();
        breaker.track_success("svc").await.unwrap();
        let transition = breaker.update_state("svc").await.unwrap();
        assert_eq!(transition.to, StateName::Closed);
    }

    #[tokio::test]
    async fn isolate_holds_until_reset() {
        let breaker = adapter(3);

        breaker.isolate("svc").await.unwrap();
        assert_eq!(breaker.state_of("svc").await.unwrap(), StateName::Isolated);

        // Updates and successes do not leave isolation.
        breaker.track_success("svc").await.unwrap();
        let transition = breaker.update_state("svc").await.unwrap();
        assert_eq!(transition.to, StateName::Isolated);

        breaker.reset("svc").await.unwrap();
        assert_eq!(breaker.state_of("svc").await.unwrap(), StateName::Closed);
    }
}
