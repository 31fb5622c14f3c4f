//! Lifting a database-shaped semaphore store to the adapter contract.
//!
//! Storage shape: a semaphore row `(key, limit)` plus a slot table
//! `(key, slot_id, expires_at)` with a unique index on `(key, slot_id)`. The
//! count-under-limit condition lives inside `insert_slot_if_limit_not_reached`
//! so databases enforce it atomically (a conditional `INSERT ... SELECT` or a
//! server-side script).

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use breakwater_core::error::StorageError;

use crate::adapter::SemaphoreAdapter;

/// CRUD contract for row-shaped semaphore storage.
#[async_trait]
pub trait DatabaseSemaphoreStore: Send + Sync {
    /// The stored limit, if the semaphore exists.
    async fn find_limit(&self, key: &str) -> Result<Option<usize>, StorageError>;

    /// Creates the semaphore row; returns `false` when it already exists.
    async fn insert_semaphore(&self, key: &str, limit: usize) -> Result<bool, StorageError>;

    /// Removes the semaphore row and all its slots; reports whether one
    /// existed.
    async fn remove_semaphore(&self, key: &str) -> Result<bool, StorageError>;

    /// Inserts a slot row iff fewer than `limit` unexpired slots exist.
    /// Returns the number of rows inserted (0 or 1). The check and the
    /// insert must be one atomic statement.
    async fn insert_slot_if_limit_not_reached(
        &self,
        key: &str,
        slot_id: &str,
        limit: usize,
        expires_at: Option<SystemTime>,
    ) -> Result<u64, StorageError>;

    /// Deletes an unexpired slot row; returns the number of rows deleted.
    async fn remove_slot(&self, key: &str, slot_id: &str) -> Result<u64, StorageError>;

    /// Extends an unexpired slot row; returns the number of rows updated.
    async fn update_slot_if_unexpired(
        &self,
        key: &str,
        slot_id: &str,
        expires_at: SystemTime,
    ) -> Result<u64, StorageError>;

    /// Number of unexpired slot rows.
    async fn count_unexpired_slots(&self, key: &str) -> Result<usize, StorageError>;
}

/// Implements [`SemaphoreAdapter`] on top of any [`DatabaseSemaphoreStore`].
pub struct DatabaseSemaphoreAdapter<S> {
    store: S,
}

impl<S> DatabaseSemaphoreAdapter<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: DatabaseSemaphoreStore> SemaphoreAdapter for DatabaseSemaphoreAdapter<S> {
    async fn acquire(
        &self,
        key: &str,
        slot_id: &str,
        limit: usize,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError> {
        let limit = limit.max(1);
        // First claim creates the semaphore row; a concurrent creator
        // winning the race is fine, its limit is re-read below.
        let effective_limit = match self.store.find_limit(key).await? {
            Some(existing) => existing,
            None => {
                self.store.insert_semaphore(key, limit).await?;
                self.store.find_limit(key).await?.unwrap_or(limit)
            }
        };

        let expires_at = ttl.map(|ttl| SystemTime::now() + ttl);
        Ok(self
            .store
            .insert_slot_if_limit_not_reached(key, slot_id, effective_limit, expires_at)
            .await?
            > 0)
    }

    async fn release(&self, key: &str, slot_id: &str) -> Result<bool, StorageError> {
        Ok(self.store.remove_slot(key, slot_id).await? > 0)
    }

    async fn refresh(
        &self,
        key: &str,
        slot_id: &str,
        ttl: Duration,
    ) -> Result<bool, StorageError> {
        let expires_at = SystemTime::now() + ttl;
        Ok(self
            .store
            .update_slot_if_unexpired(key, slot_id, expires_at)
            .await?
            > 0)
    }

    async fn force_release_all(&self, key: &str) -> Result<bool, StorageError> {
        self.store.remove_semaphore(key).await
    }

    async fn acquired_count(&self, key: &str) -> Result<usize, StorageError> {
        self.store.count_unexpired_slots(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_suite;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RowStore {
        semaphores: Mutex<HashMap<String, usize>>,
        slots: Mutex<HashMap<(String, String), Option<SystemTime>>>,
    }

    impl RowStore {
        fn live_slots(&self, key: &str, now: SystemTime) -> usize {
            self.slots
                .lock()
                .iter()
                .filter(|((k, _), expires_at)| {
                    k == key && !matches!(expires_at, Some(at) if *at <= now)
                })
                .count()
        }
    }

    #[async_trait]
    impl DatabaseSemaphoreStore for RowStore {
        async fn find_limit(&self, key: &str) -> Result<Option<usize>, StorageError> {
            Ok(self.semaphores.lock().get(key).copied())
        }

        async fn insert_semaphore(&self, key: &str, limit: usize) -> Result<bool, StorageError> {
            let mut semaphores = self.semaphores.lock();
            if semaphores.contains_key(key) {
                return Ok(false);
            }
            semaphores.insert(key.to_string(), limit);
            Ok(true)
        }

        async fn remove_semaphore(&self, key: &str) -> Result<bool, StorageError> {
            let existed = self.semaphores.lock().remove(key).is_some();
            self.slots.lock().retain(|(k, _), _| k != key);
            Ok(existed)
        }

        async fn insert_slot_if_limit_not_reached(
            &self,
            key: &str,
            slot_id: &str,
            limit: usize,
            expires_at: Option<SystemTime>,
        ) -> Result<u64, StorageError> {
            let now = SystemTime::now();
            // One lock guards both the count and the insert, mirroring a
            // single conditional statement.
            let slot_key = (key.to_string(), slot_id.to_string());
            let mut slots = self.slots.lock();
            if slots.contains_key(&slot_key) {
                return Ok(1);
            }
            let live = slots
                .iter()
                .filter(|((k, _), exp)| k == key && !matches!(exp, Some(at) if *at <= now))
                .count();
            if live >= limit {
                return Ok(0);
            }
            slots.insert(slot_key, expires_at);
            Ok(1)
        }

        async fn remove_slot(&self, key: &str, slot_id: &str) -> Result<u64, StorageError> {
            let now = SystemTime::now();
            let slot_key = (key.to_string(), slot_id.to_string());
            let mut slots = self.slots.lock();
            let live = slots
                .get(&slot_key)
                .is_some_and(|expires_at| !matches!(expires_at, Some(at) if *at <= now));
            if live {
                slots.remove(&slot_key);
            }
            Ok(live as u64)
        }

        async fn update_slot_if_unexpired(
            &self,
            key: &str,
            slot_id: &str,
            expires_at: SystemTime,
        ) -> Result<u64, StorageError> {
            let now = SystemTime::now();
            let slot_key = (key.to_string(), slot_id.to_string());
            let mut slots = self.slots.lock();
            match slots.get_mut(&slot_key) {
                Some(current) if !matches!(current.as_ref(), Some(at) if *at <= now) => {
                    *current = Some(expires_at);
                    Ok(1)
                }
                _ => Ok(0),
            }
        }

        async fn count_unexpired_slots(&self, key: &str) -> Result<usize, StorageError> {
            Ok(self.live_slots(key, SystemTime::now()))
        }
    }

    #[tokio::test]
    async fn lifted_store_satisfies_the_contract() {
        test_suite::semaphore_adapter_contract(&DatabaseSemaphoreAdapter::new(
            RowStore::default(),
        ))
        .await;
    }
}
