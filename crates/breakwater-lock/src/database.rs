//! Lifting a CRUD row store to the full lock adapter contract.
//!
//! A [`DatabaseLockStore`] is the thin, SQL-shaped seam concrete backends
//! implement: one row per key with `(key, owner, expires_at)` and a unique
//! index on `key`. The expiry conditions live in each statement's `WHERE`
//! clause, which is what makes the combined operations atomic on databases
//! without closures.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use breakwater_core::error::StorageError;

use crate::adapter::{LockAdapter, LockRecord};

/// CRUD contract for row-shaped lock storage.
#[async_trait]
pub trait DatabaseLockStore: Send + Sync {
    /// Returns the row for `key`, if any.
    async fn find(&self, key: &str) -> Result<Option<LockRecord>, StorageError>;

    /// Inserts a new row; returns `false` when the key already exists.
    async fn insert(
        &self,
        key: &str,
        owner: &str,
        expires_at: Option<SystemTime>,
    ) -> Result<bool, StorageError>;

    /// Takes over an expired row; returns the number of rows updated.
    async fn update_expired(
        &self,
        key: &str,
        owner: &str,
        expires_at: Option<SystemTime>,
    ) -> Result<u64, StorageError>;

    /// Extends a live row owned by `owner`; returns the number of rows
    /// updated.
    async fn refresh_owned(
        &self,
        key: &str,
        owner: &str,
        expires_at: SystemTime,
    ) -> Result<u64, StorageError>;

    /// Deletes a live row owned by `owner`; returns the number of rows
    /// deleted.
    async fn remove_owned(&self, key: &str, owner: &str) -> Result<u64, StorageError>;

    /// Deletes the row unconditionally; returns the number of rows deleted.
    async fn remove(&self, key: &str) -> Result<u64, StorageError>;
}

/// Implements [`LockAdapter`] on top of any [`DatabaseLockStore`].
///
/// `acquire` is insert-then-take-over-expired, giving
/// acquire-if-absent-or-expired without a read-modify-write on the caller
/// side.
pub struct DatabaseLockAdapter<S> {
    store: S,
}

impl<S> DatabaseLockAdapter<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: DatabaseLockStore> LockAdapter for DatabaseLockAdapter<S> {
    async fn acquire(
        &self,
        key: &str,
        owner: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError> {
        let expires_at = ttl.map(|ttl| SystemTime::now() + ttl);
        if self.store.insert(key, owner, expires_at).await? {
            return Ok(true);
        }
        Ok(self.store.update_expired(key, owner, expires_at).await? > 0)
    }

    async fn release(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        Ok(self.store.remove_owned(key, owner).await? > 0)
    }

    async fn force_release(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.store.remove(key).await? > 0)
    }

    async fn refresh(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, StorageError> {
        let expires_at = SystemTime::now() + ttl;
        Ok(self.store.refresh_owned(key, owner, expires_at).await? > 0)
    }

    async fn find(&self, key: &str) -> Result<Option<LockRecord>, StorageError> {
        self.store.find(key).await
    }
}
