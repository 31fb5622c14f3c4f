//! The raw semaphore adapter contract and the in-memory implementation.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use breakwater_core::error::StorageError;
use parking_lot::Mutex;

/// Storage contract for semaphores: a limit per key and a lease per slot.
///
/// The count-below-limit check and the slot insertion in `acquire` must be
/// one atomic step; the provider-visible invariant is that live slots never
/// exceed the limit.
#[async_trait]
pub trait SemaphoreAdapter: Send + Sync {
    /// Claims a slot iff fewer than `limit` live slots exist. The limit is
    /// fixed by the first claim on the key; later calls reuse the stored
    /// limit.
    async fn acquire(
        &self,
        key: &str,
        slot_id: &str,
        limit: usize,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError>;

    /// Releases a slot iff it exists and is unexpired.
    async fn release(&self, key: &str, slot_id: &str) -> Result<bool, StorageError>;

    /// Extends a slot's lease iff it exists and is unexpired.
    async fn refresh(
        &self,
        key: &str,
        slot_id: &str,
        ttl: Duration,
    ) -> Result<bool, StorageError>;

    /// Removes the whole semaphore (limit and every slot); reports whether
    /// one existed.
    async fn force_release_all(&self, key: &str) -> Result<bool, StorageError>;

    /// Number of live slots.
    async fn acquired_count(&self, key: &str) -> Result<usize, StorageError>;
}

#[derive(Debug, Clone)]
struct SemaphoreRecord {
    limit: usize,
    slots: HashMap<String, Option<SystemTime>>,
}

impl SemaphoreRecord {
    fn prune(&mut self, now: SystemTime) {
        self.slots
            .retain(|_, expires_at| !matches!(expires_at, Some(at) if *at <= now));
    }

    fn live_count(&self, now: SystemTime) -> usize {
        self.slots
            .values()
            .filter(|expires_at| !matches!(expires_at, Some(at) if *at <= now))
            .count()
    }
}

/// In-memory semaphore adapter. Single-process only.
#[derive(Default)]
pub struct MemorySemaphoreAdapter {
    records: Mutex<HashMap<String, SemaphoreRecord>>,
}

impl MemorySemaphoreAdapter {
    /// Creates an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SemaphoreAdapter for MemorySemaphoreAdapter {
    async fn acquire(
        &self,
        key: &str,
        slot_id: &str,
        limit: usize,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let record = records.entry(key.to_string()).or_insert_with(|| {
            SemaphoreRecord {
                limit: limit.max(1),
                slots: HashMap::new(),
            }
        });
        record.prune(now);
        if record.slots.contains_key(slot_id) {
            return Ok(true);
        }
        if record.slots.len() >= record.limit {
            return Ok(false);
        }
        record
            .slots
            .insert(slot_id.to_string(), ttl.map(|ttl| now + ttl));
        Ok(true)
    }

    async fn release(&self, key: &str, slot_id: &str) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(key) else {
            return Ok(false);
        };
        let live = record
            .slots
            .get(slot_id)
            .is_some_and(|expires_at| !matches!(expires_at, Some(at) if *at <= now));
        if live {
            record.slots.remove(slot_id);
        }
        Ok(live)
    }

    async fn refresh(
        &self,
        key: &str,
        slot_id: &str,
        ttl: Duration,
    ) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        match records.get_mut(key) {
            Some(record) => match record.slots.get_mut(slot_id) {
                Some(expires_at) if !matches!(expires_at.as_ref(), Some(at) if *at <= now) => {
                    *expires_at = Some(now + ttl);
                    Ok(true)
                }
                _ => Ok(false),
            },
            None => Ok(false),
        }
    }

    async fn force_release_all(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.records.lock().remove(key).is_some())
    }

    async fn acquired_count(&self, key: &str) -> Result<usize, StorageError> {
        let now = SystemTime::now();
        Ok(self
            .records
            .lock()
            .get(key)
            .map(|record| record.live_count(now))
            .unwrap_or(0))
    }
}
