//! Storage adapter contract and the in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use breakwater_core::error::StorageError;
use parking_lot::Mutex;

use crate::state::CircuitState;

/// The read-modify-write function a storage adapter applies atomically.
///
/// `None` input means no record exists for the key yet.
pub type UpdateFn<M> =
    Box<dyn FnOnce(Option<CircuitState<M>>) -> CircuitState<M> + Send>;

/// Storage contract for persisted breaker state.
///
/// Concurrent `update` calls on one key must serialize so that no update is
/// lost. Adapters without native closures implement `update` with database
/// transactions or compare-and-set loops.
#[async_trait]
pub trait CircuitBreakerStorage<M>: Send + Sync {
    /// Returns the state stored for `key`, if any.
    async fn find(&self, key: &str) -> Result<Option<CircuitState<M>>, StorageError>;

    /// Removes the record for `key`.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Applies `f` to the current state atomically and persists the result.
    /// Returns the previous and the new state.
    async fn update(
        &self,
        key: &str,
        f: UpdateFn<M>,
    ) -> Result<(Option<CircuitState<M>>, CircuitState<M>), StorageError>;
}

/// In-memory breaker storage. Single-process only.
#[derive(Default)]
pub struct MemoryCircuitBreakerStorage<M> {
    records: Mutex<HashMap<String, CircuitState<M>>>,
}

impl<M> MemoryCircuitBreakerStorage<M> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<M> CircuitBreakerStorage<M> for MemoryCircuitBreakerStorage<M>
where
    M: Clone + Send + Sync + 'static,
{
    async fn find(&self, key: &str) -> Result<Option<CircuitState<M>>, StorageError> {
        Ok(self.records.lock().get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.records.lock().remove(key);
        Ok(())
    }

    async fn update(
        &self,
        key: &str,
        f: UpdateFn<M>,
    ) -> Result<(Option<CircuitState<M>>, CircuitState<M>), StorageError> {
        let mut records = self.records.lock();
        let previous = records.get(key).cloned();
        let next = f(previous.clone());
        records.insert(key.to_string(), next.clone());
        Ok((previous, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn update_applies_over_the_previous_state() {
        let storage: MemoryCircuitBreakerStorage<u32> = MemoryCircuitBreakerStorage::new();

        let (previous, next) = storage
            .update(
                "svc",
                Box::new(|state| match state {
                    None => CircuitState::Closed { metrics: 1 },
                    Some(CircuitState::Closed { metrics }) => {
                        CircuitState::Closed { metrics: metrics + 1 }
                    }
                    Some(other) => other,
                }),
            )
            .await
            .unwrap();
        assert!(previous.is_none());
        assert_eq!(next, CircuitState::Closed { metrics: 1 });

        let (previous, next) = storage
            .update(
                "svc",
                Box::new(|state| match state {
                    Some(CircuitState::Closed { metrics }) => {
                        CircuitState::Closed { metrics: metrics + 1 }
                    }
                    _ => CircuitState::Isolated,
                }),
            )
            .await
            .unwrap();
        assert_eq!(previous, Some(CircuitState::Closed { metrics: 1 }));
        assert_eq!(next, CircuitState::Closed { metrics: 2 });
    }

    #[tokio::test]
    async fn remove_clears_the_record() {
        let storage: MemoryCircuitBreakerStorage<u32> = MemoryCircuitBreakerStorage::new();
        storage
            .update("svc", Box::new(|_| CircuitState::Isolated))
            .await
            .unwrap();
        assert!(storage.find("svc").await.unwrap().is_some());

        storage.remove("svc").await.unwrap();
        assert!(storage.find("svc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let storage: Arc<MemoryCircuitBreakerStorage<u64>> =
            Arc::new(MemoryCircuitBreakerStorage::new());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .update(
                        "counter",
                        Box::new(|state| {
                            let current = match state {
                                Some(CircuitState::Closed { metrics }) => metrics,
                                _ => 0,
                            };
                            CircuitState::Closed {
                                metrics: current + 1,
                            }
                        }),
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        match storage.find("counter").await.unwrap() {
            Some(CircuitState::Closed { metrics }) => assert_eq!(metrics, 50),
            other => panic!("unexpected state: {other:?}"),
        }
    }
}
