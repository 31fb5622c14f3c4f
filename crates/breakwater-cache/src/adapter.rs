//! The cache adapter contract and the in-memory implementation.
//!
//! Adapters store JSON values; the provider converts typed values at the
//! edge. Expired entries behave as absent to every reader; reclaiming them
//! may be lazy.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::CacheError;

/// A stored cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    /// `None` means the entry never expires.
    pub expires_at: Option<SystemTime>,
}

impl CacheEntry {
    /// An entry is expired iff it has an expiration at or before `now`.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Storage contract for caches.
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Returns the live value for `key`, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Returns the live value and removes the entry.
    async fn get_and_remove(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Writes iff no live entry exists (SETNX). An expired entry is
    /// replaced.
    async fn add(&self, key: &str, value: Value, ttl: Option<Duration>)
        -> Result<bool, CacheError>;

    /// Always writes; returns `true` iff a live entry was replaced.
    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>)
        -> Result<bool, CacheError>;

    /// Writes iff a live entry exists, preserving its remaining
    /// expiration.
    async fn update(&self, key: &str, value: Value) -> Result<bool, CacheError>;

    /// Adds `delta` to a live numeric entry. Fails with
    /// [`CacheError::Type`] when the stored value is non-numeric.
    async fn increment(&self, key: &str, delta: i64) -> Result<bool, CacheError>;

    /// Removes entries; returns `true` iff any live entry was removed.
    async fn remove_many(&self, keys: &[String]) -> Result<bool, CacheError>;

    /// Removes every entry.
    async fn remove_all(&self) -> Result<(), CacheError>;

    /// Removes every entry whose key starts with `prefix`.
    async fn remove_by_key_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

/// In-memory cache adapter over a concurrent map. Single-process only.
#[derive(Default)]
pub struct MemoryCacheAdapter {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCacheAdapter {
    /// Creates an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }

    fn expiry(ttl: Option<Duration>, now: SystemTime) -> Option<SystemTime> {
        ttl.map(|ttl| now + ttl)
    }
}

#[async_trait]
impl CacheAdapter for MemoryCacheAdapter {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = SystemTime::now();
        // The read guard must drop before the reclaim takes a write lock on
        // the same shard.
        let found = self
            .entries
            .get(key)
            .map(|entry| (entry.value.clone(), entry.is_expired(now)));
        match found {
            Some((value, false)) => Ok(Some(value)),
            Some((_, true)) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn get_and_remove(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = SystemTime::now();
        Ok(self
            .entries
            .remove(key)
            .map(|(_, entry)| entry)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value))
    }

    async fn add(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let now = SystemTime::now();
        let mut added = false;
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| {
                added = true;
                CacheEntry {
                    value: value.clone(),
                    expires_at: Self::expiry(ttl, now),
                }
            });
        if !added && entry.is_expired(now) {
            *entry = CacheEntry {
                value,
                expires_at: Self::expiry(ttl, now),
            };
            added = true;
        }
        Ok(added)
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let now = SystemTime::now();
        let previous = self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Self::expiry(ttl, now),
            },
        );
        Ok(matches!(previous, Some(entry) if !entry.is_expired(now)))
    }

    async fn update(&self, key: &str, value: Value) -> Result<bool, CacheError> {
        let now = SystemTime::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.value = value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<bool, CacheError> {
        let now = SystemTime::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                let current = &entry.value;
                let next = if let Some(n) = current.as_i64() {
                    Value::from(n + delta)
                } else if let Some(f) = current.as_f64() {
                    Value::from(f + delta as f64)
                } else {
                    return Err(CacheError::Type {
                        key: key.to_string(),
                    });
                };
                entry.value = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_many(&self, keys: &[String]) -> Result<bool, CacheError> {
        let now = SystemTime::now();
        let mut removed_live = false;
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(key) {
                removed_live |= !entry.is_expired(now);
            }
        }
        Ok(removed_live)
    }

    async fn remove_all(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }

    async fn remove_by_key_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}
