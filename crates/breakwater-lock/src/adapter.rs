//! The raw lock adapter contract and the in-memory implementation.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use breakwater_core::error::StorageError;
use parking_lot::Mutex;

/// A stored lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub owner: String,
    /// `None` means a non-expiring lease.
    pub expires_at: Option<SystemTime>,
}

impl LockRecord {
    /// A record is expired iff it has an expiration at or before `now`.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Storage contract for locks.
///
/// Expected contract outcomes (taken, not owner, expired) are reported as
/// booleans; only real storage failures surface as [`StorageError`]. Every
/// method must be atomic with respect to other calls on the same key: in
/// particular `acquire` combines the liveness check and the write.
#[async_trait]
pub trait LockAdapter: Send + Sync {
    /// Takes the lease iff no live record exists for `key`. An expired
    /// record is replaced.
    async fn acquire(
        &self,
        key: &str,
        owner: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError>;

    /// Releases the lease iff a live record owned by `owner` exists.
    async fn release(&self, key: &str, owner: &str) -> Result<bool, StorageError>;

    /// Deletes any record unconditionally; reports whether one existed.
    async fn force_release(&self, key: &str) -> Result<bool, StorageError>;

    /// Extends the lease iff a live record owned by `owner` exists.
    async fn refresh(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, StorageError>;

    /// Returns the record for `key`, if any (expired records included).
    async fn find(&self, key: &str) -> Result<Option<LockRecord>, StorageError>;
}

/// In-memory lock adapter. Single-process only.
#[derive(Default)]
pub struct MemoryLockAdapter {
    records: Mutex<HashMap<String, LockRecord>>,
}

impl MemoryLockAdapter {
    /// Creates an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockAdapter for MemoryLockAdapter {
    async fn acquire(
        &self,
        key: &str,
        owner: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let held = records.get(key).is_some_and(|record| !record.is_expired(now));
        if held {
            return Ok(false);
        }
        records.insert(
            key.to_string(),
            LockRecord {
                owner: owner.to_string(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let owned = records
            .get(key)
            .is_some_and(|record| !record.is_expired(now) && record.owner == owner);
        if owned {
            records.remove(key);
        }
        Ok(owned)
    }

    async fn force_release(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.records.lock().remove(key).is_some())
    }

    async fn refresh(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        match records.get_mut(key) {
            Some(record) if !record.is_expired(now) && record.owner == owner => {
                record.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find(&self, key: &str) -> Result<Option<LockRecord>, StorageError> {
        Ok(self.records.lock().get(key).cloned())
    }
}
