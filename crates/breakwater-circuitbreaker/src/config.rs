use std::sync::Arc;

use breakwater_core::backoff::BackoffPolicy;
use breakwater_core::events::{EventListeners, FnListener};

use crate::breaker::CircuitBreakerAdapter;
use crate::classifier::{DefaultClassifier, FnClassifier};
use crate::events::CircuitBreakerEvent;
use crate::policy::CircuitBreakerPolicy;
use crate::state::StateName;
use crate::storage::{CircuitBreakerStorage, MemoryCircuitBreakerStorage};

/// Builder for a [`CircuitBreakerLayer`](crate::CircuitBreakerLayer).
///
/// The type parameter `C` is the failure classifier; it defaults to
/// [`DefaultClassifier`] (every error counts as a failure).
pub struct CircuitBreakerConfigBuilder<P: CircuitBreakerPolicy, C = DefaultClassifier> {
    policy: P,
    storage: Option<Arc<dyn CircuitBreakerStorage<P::Metrics>>>,
    backoff: BackoffPolicy,
    classifier: C,
    key: Option<String>,
    name: String,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl<P: CircuitBreakerPolicy> CircuitBreakerConfigBuilder<P, DefaultClassifier> {
    /// Creates a builder around a policy.
    ///
    /// Defaults:
    /// - storage: in-memory (single-process)
    /// - reopen backoff: exponential from 30s capped at 10min
    /// - key: the instance name
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            storage: None,
            backoff: BackoffPolicy::exponential(
                std::time::Duration::from_secs(30),
                std::time::Duration::from_secs(600),
            ),
            classifier: DefaultClassifier,
            key: None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Replaces the default classifier with a function over the call result.
    pub fn failure_classifier<F>(
        self,
        f: F,
    ) -> CircuitBreakerConfigBuilder<P, FnClassifier<F>> {
        CircuitBreakerConfigBuilder {
            policy: self.policy,
            storage: self.storage,
            backoff: self.backoff,
            classifier: FnClassifier::new(f),
            key: self.key,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl<P: CircuitBreakerPolicy, C> CircuitBreakerConfigBuilder<P, C> {
    /// Sets the storage adapter the breaker state lives in.
    pub fn storage(mut self, storage: Arc<dyn CircuitBreakerStorage<P::Metrics>>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the backoff schedule for reopen times.
    pub fn reopen_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the storage key this layer guards. Defaults to the name.
    pub fn key<S: Into<String>>(mut self, key: S) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the instance name used in events.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked on every state transition.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(StateName, StateName) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::StateTransition { from, to, .. } = event {
                f(*from, *to);
            }
        }));
        self
    }

    /// Registers a callback invoked when a call is rejected.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(StateName) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::CallRejected { state, .. } = event {
                f(*state);
            }
        }));
        self
    }

    /// Builds the layer.
    pub fn build(self) -> crate::CircuitBreakerLayer<P, C> {
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryCircuitBreakerStorage::new()));
        let key = self.key.unwrap_or_else(|| self.name.clone());
        let adapter = CircuitBreakerAdapter::new(
            self.policy,
            storage,
            self.backoff,
            self.event_listeners,
            self.name,
        );
        crate::CircuitBreakerLayer::from_parts(Arc::new(adapter), Arc::new(self.classifier), key)
    }
}
