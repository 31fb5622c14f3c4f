//! The shared (reader/writer) lock adapter contract and the in-memory
//! implementation.
//!
//! State per key is a writer lease plus a reader slot map. Exclusivity is
//! enforced inside every adapter call: a live writer and a live reader slot
//! never coexist.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use breakwater_core::error::StorageError;
use breakwater_lock::LockRecord;
use parking_lot::Mutex;

/// Why an acquisition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// A live writer holds the key.
    WriterHeld,
    /// Live reader slots hold the key (writer acquisition only).
    ReadersHeld,
    /// The reader limit is reached (reader acquisition only).
    ReaderLimitReached,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            UnavailableReason::WriterHeld => "writer held",
            UnavailableReason::ReadersHeld => "readers held",
            UnavailableReason::ReaderLimitReached => "reader limit reached",
        };
        f.write_str(reason)
    }
}

/// Storage contract for reader/writer locks.
#[async_trait]
pub trait SharedLockAdapter: Send + Sync {
    /// Takes the writer lease iff no live writer and no live reader slot
    /// exists.
    async fn acquire_writer(
        &self,
        key: &str,
        owner: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError>;

    /// Releases the writer lease iff live and owned by `owner`.
    async fn release_writer(&self, key: &str, owner: &str) -> Result<bool, StorageError>;

    /// Extends the writer lease iff live and owned by `owner`.
    async fn refresh_writer(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, StorageError>;

    /// Claims a reader slot iff no live writer exists and fewer than
    /// `limit` live reader slots exist.
    async fn acquire_reader(
        &self,
        key: &str,
        slot_id: &str,
        limit: usize,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError>;

    /// Releases a reader slot iff it exists and is unexpired.
    async fn release_reader(&self, key: &str, slot_id: &str) -> Result<bool, StorageError>;

    /// Extends a reader slot iff it exists and is unexpired.
    async fn refresh_reader(
        &self,
        key: &str,
        slot_id: &str,
        ttl: Duration,
    ) -> Result<bool, StorageError>;

    /// Clears both sides unconditionally; reports whether anything live
    /// existed.
    async fn force_release(&self, key: &str) -> Result<bool, StorageError>;

    /// Number of live reader slots.
    async fn reader_count(&self, key: &str) -> Result<usize, StorageError>;

    /// The live writer lease, if any.
    async fn writer_of(&self, key: &str) -> Result<Option<LockRecord>, StorageError>;
}

#[derive(Debug, Default)]
struct SharedRecord {
    writer: Option<LockRecord>,
    readers: HashMap<String, Option<SystemTime>>,
}

impl SharedRecord {
    fn prune(&mut self, now: SystemTime) {
        if matches!(&self.writer, Some(w) if w.is_expired(now)) {
            self.writer = None;
        }
        self.readers
            .retain(|_, expires_at| !matches!(expires_at, Some(at) if *at <= now));
    }

    fn is_empty(&self) -> bool {
        self.writer.is_none() && self.readers.is_empty()
    }
}

/// In-memory shared lock adapter. Single-process only.
#[derive(Default)]
pub struct MemorySharedLockAdapter {
    records: Mutex<HashMap<String, SharedRecord>>,
}

impl MemorySharedLockAdapter {
    /// Creates an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedLockAdapter for MemorySharedLockAdapter {
    async fn acquire_writer(
        &self,
        key: &str,
        owner: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let record = records.entry(key.to_string()).or_default();
        record.prune(now);
        if record.writer.is_some() || !record.readers.is_empty() {
            return Ok(false);
        }
        record.writer = Some(LockRecord {
            owner: owner.to_string(),
            expires_at: ttl.map(|ttl| now + ttl),
        });
        Ok(true)
    }

    async fn release_writer(&self, key: &str, owner: &str) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(key) else {
            return Ok(false);
        };
        record.prune(now);
        let released = matches!(&record.writer, Some(writer) if writer.owner == owner);
        if released {
            record.writer = None;
        }
        let empty = record.is_empty();
        if empty {
            records.remove(key);
        }
        Ok(released)
    }

    async fn refresh_writer(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(key) else {
            return Ok(false);
        };
        record.prune(now);
        match &mut record.writer {
            Some(writer) if writer.owner == owner => {
                writer.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn acquire_reader(
        &self,
        key: &str,
        slot_id: &str,
        limit: usize,
        ttl: Option<Duration>,
    ) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let record = records.entry(key.to_string()).or_default();
        record.prune(now);
        if record.writer.is_some() {
            return Ok(false);
        }
        if record.readers.contains_key(slot_id) {
            return Ok(true);
        }
        if record.readers.len() >= limit.max(1) {
            return Ok(false);
        }
        record
            .readers
            .insert(slot_id.to_string(), ttl.map(|ttl| now + ttl));
        Ok(true)
    }

    async fn release_reader(&self, key: &str, slot_id: &str) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(key) else {
            return Ok(false);
        };
        record.prune(now);
        let released = record.readers.remove(slot_id).is_some();
        let empty = record.is_empty();
        if empty {
            records.remove(key);
        }
        Ok(released)
    }

    async fn refresh_reader(
        &self,
        key: &str,
        slot_id: &str,
        ttl: Duration,
    ) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(key) else {
            return Ok(false);
        };
        record.prune(now);
        match record.readers.get_mut(slot_id) {
            Some(expires_at) => {
                *expires_at = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn force_release(&self, key: &str) -> Result<bool, StorageError> {
        let now = SystemTime::now();
        let mut records = self.records.lock();
        match records.remove(key) {
            Some(mut record) => {
                record.prune(now);
                Ok(!record.is_empty())
            }
            None => Ok(false),
        }
    }

    async fn reader_count(&self, key: &str) -> Result<usize, StorageError> {
        let now = SystemTime::now();
        Ok(self
            .records
            .lock()
            .get(key)
            .map(|record| {
                record
                    .readers
                    .values()
                    .filter(|expires_at| !matches!(expires_at, Some(at) if *at <= now))
                    .count()
            })
            .unwrap_or(0))
    }

    async fn writer_of(&self, key: &str) -> Result<Option<LockRecord>, StorageError> {
        let now = SystemTime::now();
        Ok(self
            .records
            .lock()
            .get(key)
            .and_then(|record| record.writer.clone())
            .filter(|writer| !writer.is_expired(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_suite;

    #[tokio::test]
    async fn memory_adapter_satisfies_the_contract() {
        test_suite::shared_lock_adapter_contract(&MemorySharedLockAdapter::new()).await;
    }
}
