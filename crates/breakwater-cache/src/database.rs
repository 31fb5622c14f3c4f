//! Lifting a CRUD row store to the full cache adapter contract.
//!
//! Storage shape: `(key TEXT, value TEXT, expires_at TIMESTAMP NULL)` with a
//! unique index on `key`. Values are serialized JSON; expiry conditions live
//! in each statement's `WHERE` clause. Expired rows are reclaimed lazily on
//! read.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use breakwater_core::error::StorageError;
use serde_json::Value;

use crate::adapter::CacheAdapter;
use crate::error::CacheError;

/// A stored cache row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRow {
    pub value: String,
    pub expires_at: Option<SystemTime>,
}

impl CacheRow {
    /// A row is expired iff it has an expiration at or before `now`.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// CRUD contract for row-shaped cache storage.
#[async_trait]
pub trait DatabaseCacheStore: Send + Sync {
    /// Returns the row for `key`, expired rows included.
    async fn find(&self, key: &str) -> Result<Option<CacheRow>, StorageError>;

    /// Inserts a new row; returns `false` when the key already exists.
    async fn insert(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<SystemTime>,
    ) -> Result<bool, StorageError>;

    /// Writes the row unconditionally; returns the prior row, if any.
    async fn upsert(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<SystemTime>,
    ) -> Result<Option<CacheRow>, StorageError>;

    /// Overwrites an expired row; returns the number of rows updated.
    async fn update_expired(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<SystemTime>,
    ) -> Result<u64, StorageError>;

    /// Overwrites the value of an unexpired row, leaving `expires_at`
    /// untouched; returns the number of rows updated.
    async fn update_unexpired(&self, key: &str, value: &str) -> Result<u64, StorageError>;

    /// Adds `delta` to the numeric value of an unexpired row; returns the
    /// number of rows updated. Fails when the stored value is non-numeric.
    async fn increment_unexpired(&self, key: &str, delta: i64) -> Result<u64, StorageError>;

    /// Deletes expired rows among `keys`; returns the number deleted.
    async fn remove_expired_many(&self, keys: &[String]) -> Result<u64, StorageError>;

    /// Deletes unexpired rows among `keys`; returns the number deleted.
    async fn remove_unexpired_many(&self, keys: &[String]) -> Result<u64, StorageError>;

    /// Deletes every row.
    async fn remove_all(&self) -> Result<(), StorageError>;

    /// Deletes every row whose key starts with `prefix`.
    async fn remove_by_key_prefix(&self, prefix: &str) -> Result<(), StorageError>;
}

/// Implements [`CacheAdapter`] on top of any [`DatabaseCacheStore`].
pub struct DatabaseCacheAdapter<S> {
    store: S,
}

impl<S> DatabaseCacheAdapter<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: DatabaseCacheStore> DatabaseCacheAdapter<S> {
    fn decode(key: &str, row: CacheRow) -> Result<Value, CacheError> {
        serde_json::from_str(&row.value).map_err(|source| CacheError::Deserialization {
            key: key.to_string(),
            source,
        })
    }

    fn encode(key: &str, value: &Value) -> Result<String, CacheError> {
        serde_json::to_string(value).map_err(|source| CacheError::Serialization {
            key: key.to_string(),
            source,
        })
    }
}

#[async_trait]
impl<S: DatabaseCacheStore> CacheAdapter for DatabaseCacheAdapter<S> {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = SystemTime::now();
        match self.store.find(key).await? {
            Some(row) if row.is_expired(now) => {
                self.store.remove_expired_many(&[key.to_string()]).await?;
                Ok(None)
            }
            Some(row) => Ok(Some(Self::decode(key, row)?)),
            None => Ok(None),
        }
    }

    async fn get_and_remove(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = SystemTime::now();
        match self.store.find(key).await? {
            Some(row) if row.is_expired(now) => {
                self.store.remove_expired_many(&[key.to_string()]).await?;
                Ok(None)
            }
            Some(row) => {
                self.store.remove_unexpired_many(&[key.to_string()]).await?;
                Ok(Some(Self::decode(key, row)?))
            }
            None => Ok(None),
        }
    }

    async fn add(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let encoded = Self::encode(key, &value)?;
        let expires_at = ttl.map(|ttl| SystemTime::now() + ttl);
        if self.store.insert(key, &encoded, expires_at).await? {
            return Ok(true);
        }
        Ok(self.store.update_expired(key, &encoded, expires_at).await? > 0)
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let encoded = Self::encode(key, &value)?;
        let now = SystemTime::now();
        let expires_at = ttl.map(|ttl| now + ttl);
        let prior = self.store.upsert(key, &encoded, expires_at).await?;
        Ok(matches!(prior, Some(row) if !row.is_expired(now)))
    }

    async fn update(&self, key: &str, value: Value) -> Result<bool, CacheError> {
        let encoded = Self::encode(key, &value)?;
        Ok(self.store.update_unexpired(key, &encoded).await? > 0)
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<bool, CacheError> {
        // A failed numeric update means the stored value is not a number;
        // the storage cause is rewrapped as the typed error.
        match self.store.increment_unexpired(key, delta).await {
            Ok(updated) => Ok(updated > 0),
            Err(_) => Err(CacheError::Type {
                key: key.to_string(),
            }),
        }
    }

    async fn remove_many(&self, keys: &[String]) -> Result<bool, CacheError> {
        let unexpired = self.store.remove_unexpired_many(keys).await?;
        self.store.remove_expired_many(keys).await?;
        Ok(unexpired > 0)
    }

    async fn remove_all(&self) -> Result<(), CacheError> {
        Ok(self.store.remove_all().await?)
    }

    async fn remove_by_key_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        Ok(self.store.remove_by_key_prefix(prefix).await?)
    }
}
