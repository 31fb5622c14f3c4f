//! The user-facing shared lock handles.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use breakwater_core::blocking::BlockingSettings;
use breakwater_core::error::StorageError;
use breakwater_core::events::EventListeners;
use breakwater_core::namespace::Key;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapter::{SharedLockAdapter, UnavailableReason};
use crate::error::{SharedLockError, Side};
use crate::events::SharedLockEvent;

/// The serializable identity of a writer handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterState {
    pub key: Key,
    pub owner: String,
    pub ttl_ms: Option<u64>,
}

/// The serializable identity of a reader handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderState {
    pub key: Key,
    pub slot_id: String,
    pub limit: usize,
    pub ttl_ms: Option<u64>,
}

/// Shared plumbing of the writer and reader handles.
#[derive(Clone)]
pub(crate) struct HandleCore {
    pub(crate) adapter: Arc<dyn SharedLockAdapter>,
    pub(crate) event_listeners: EventListeners<SharedLockEvent>,
    pub(crate) provider_name: String,
    pub(crate) key: Key,
}

impl HandleCore {
    fn emit(&self, event: SharedLockEvent) {
        self.event_listeners.emit(&event);
    }

    fn base(&self) -> (String, Instant) {
        (self.provider_name.clone(), Instant::now())
    }

    async fn guard<T>(
        &self,
        fut: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, SharedLockError> {
        match fut.await {
            Ok(value) => Ok(value),
            Err(err) => {
                let (pattern_name, timestamp) = self.base();
                self.emit(SharedLockEvent::UnexpectedError {
                    pattern_name,
                    timestamp,
                    key: self.key.original().to_string(),
                    message: err.to_string(),
                });
                Err(SharedLockError::Storage(err))
            }
        }
    }
}

/// A handle on one reader/writer lock key. Produces side-specific handles.
#[derive(Clone)]
pub struct SharedLock {
    pub(crate) core: HandleCore,
    pub(crate) default_ttl: Option<Duration>,
    pub(crate) default_limit: usize,
}

impl SharedLock {
    /// The key this handle guards.
    pub fn key(&self) -> &Key {
        &self.core.key
    }

    /// A writer handle with a fresh owner identity.
    pub fn writer(&self) -> WriterLock {
        self.writer_with_owner(Uuid::new_v4().to_string())
    }

    /// A writer handle with an explicit owner identity.
    pub fn writer_with_owner(&self, owner: impl Into<String>) -> WriterLock {
        WriterLock {
            core: self.core.clone(),
            owner: owner.into(),
            ttl: self.default_ttl,
        }
    }

    /// A reader handle under the default reader limit.
    pub fn reader(&self) -> ReaderLock {
        self.reader_with_limit(self.default_limit)
    }

    /// A reader handle with an explicit reader limit.
    pub fn reader_with_limit(&self, limit: usize) -> ReaderLock {
        ReaderLock {
            core: self.core.clone(),
            slot_id: Uuid::new_v4().to_string(),
            limit: limit.max(1),
            ttl: self.default_ttl,
        }
    }

    /// Clears both sides unconditionally.
    pub async fn force_release(&self) -> Result<bool, SharedLockError> {
        let released = self
            .core
            .guard(self.core.adapter.force_release(self.core.key.namespaced()))
            .await?;
        if released {
            let (pattern_name, timestamp) = self.core.base();
            self.core.emit(SharedLockEvent::ForceReleased {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
            });
        }
        Ok(released)
    }

    /// Number of live reader slots.
    pub async fn reader_count(&self) -> Result<usize, SharedLockError> {
        self.core
            .guard(self.core.adapter.reader_count(self.core.key.namespaced()))
            .await
    }

    /// Whether a live writer holds the key.
    pub async fn is_writer_held(&self) -> Result<bool, SharedLockError> {
        Ok(self
            .core
            .guard(self.core.adapter.writer_of(self.core.key.namespaced()))
            .await?
            .is_some())
    }
}

/// The exclusive side of a shared lock.
#[derive(Clone)]
pub struct WriterLock {
    core: HandleCore,
    owner: String,
    ttl: Option<Duration>,
}

impl WriterLock {
    /// This handle's owner identity.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The serializable identity of this handle.
    pub fn state(&self) -> WriterState {
        WriterState {
            key: self.core.key.clone(),
            owner: self.owner.clone(),
            ttl_ms: self.ttl.map(|ttl| ttl.as_millis() as u64),
        }
    }

    /// Takes the writer lease. `false` means a writer or readers hold the
    /// key.
    pub async fn acquire(&self) -> Result<bool, SharedLockError> {
        let acquired = self
            .core
            .guard(self.core.adapter.acquire_writer(
                self.core.key.namespaced(),
                &self.owner,
                self.ttl,
            ))
            .await?;
        let (pattern_name, timestamp) = self.core.base();
        if acquired {
            self.core.emit(SharedLockEvent::Acquired {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Writer,
                holder: self.owner.clone(),
            });
        } else {
            let reason = self.unavailable_reason().await?;

            #[cfg(feature = "tracing")]
            tracing::debug!(key = %self.core.key, %reason, "writer acquisition refused");

            self.core.emit(SharedLockEvent::Unavailable {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Writer,
                reason,
            });
        }
        Ok(acquired)
    }

    /// Takes the lease or fails with [`SharedLockError::Unavailable`].
    pub async fn acquire_or_fail(&self) -> Result<(), SharedLockError> {
        if self.acquire().await? {
            Ok(())
        } else {
            Err(SharedLockError::Unavailable {
                key: self.core.key.original().to_string(),
                reason: self.unavailable_reason().await?,
            })
        }
    }

    /// Retries `acquire` every `settings.interval` until success or
    /// `settings.time` has elapsed.
    pub async fn acquire_blocking(
        &self,
        settings: BlockingSettings,
    ) -> Result<bool, SharedLockError> {
        let started = Instant::now();
        loop {
            if self.acquire().await? {
                return Ok(true);
            }
            if started.elapsed() + settings.interval >= settings.time {
                return Ok(false);
            }
            tokio::time::sleep(settings.interval).await;
        }
    }

    /// Blocking acquire failing with [`SharedLockError::Unavailable`] when
    /// the time budget runs out.
    pub async fn acquire_blocking_or_fail(
        &self,
        settings: BlockingSettings,
    ) -> Result<(), SharedLockError> {
        if self.acquire_blocking(settings).await? {
            Ok(())
        } else {
            Err(SharedLockError::Unavailable {
                key: self.core.key.original().to_string(),
                reason: self.unavailable_reason().await?,
            })
        }
    }

    /// Releases the writer lease. `false` means this owner does not hold
    /// it.
    pub async fn release(&self) -> Result<bool, SharedLockError> {
        let released = self
            .core
            .guard(
                self.core
                    .adapter
                    .release_writer(self.core.key.namespaced(), &self.owner),
            )
            .await?;
        let (pattern_name, timestamp) = self.core.base();
        let event = if released {
            SharedLockEvent::Released {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Writer,
                holder: self.owner.clone(),
            }
        } else {
            SharedLockEvent::FailedRelease {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Writer,
                holder: self.owner.clone(),
            }
        };
        self.core.emit(event);
        Ok(released)
    }

    /// Releases the lease or fails with [`SharedLockError::UnownedRelease`].
    pub async fn release_or_fail(&self) -> Result<(), SharedLockError> {
        if self.release().await? {
            Ok(())
        } else {
            Err(SharedLockError::UnownedRelease {
                key: self.core.key.original().to_string(),
                side: Side::Writer,
            })
        }
    }

    /// Extends the lease by the handle's TTL. Non-expiring leases report
    /// `false`.
    pub async fn refresh(&self) -> Result<bool, SharedLockError> {
        let Some(ttl) = self.ttl else {
            return Ok(false);
        };
        self.refresh_with(ttl).await
    }

    /// Extends the lease by an explicit TTL.
    pub async fn refresh_with(&self, ttl: Duration) -> Result<bool, SharedLockError> {
        let refreshed = self
            .core
            .guard(self.core.adapter.refresh_writer(
                self.core.key.namespaced(),
                &self.owner,
                ttl,
            ))
            .await?;
        let (pattern_name, timestamp) = self.core.base();
        let event = if refreshed {
            SharedLockEvent::Refreshed {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Writer,
                holder: self.owner.clone(),
            }
        } else {
            SharedLockEvent::FailedRefresh {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Writer,
                holder: self.owner.clone(),
            }
        };
        self.core.emit(event);
        Ok(refreshed)
    }

    /// Refreshes the lease or fails with [`SharedLockError::UnownedRefresh`].
    pub async fn refresh_or_fail(&self) -> Result<(), SharedLockError> {
        if self.refresh().await? {
            Ok(())
        } else {
            Err(SharedLockError::UnownedRefresh {
                key: self.core.key.original().to_string(),
                side: Side::Writer,
            })
        }
    }

    /// Runs `f` holding the writer lease; released on the way out.
    pub async fn run<F, T>(&self, f: F) -> Result<Option<T>, SharedLockError>
    where
        F: Future<Output = T>,
    {
        if !self.acquire().await? {
            return Ok(None);
        }
        let out = f.await;
        self.release().await?;
        Ok(Some(out))
    }

    /// Runs `f` holding the writer lease or fails with
    /// [`SharedLockError::Unavailable`].
    pub async fn run_or_fail<F, T>(&self, f: F) -> Result<T, SharedLockError>
    where
        F: Future<Output = T>,
    {
        self.acquire_or_fail().await?;
        let out = f.await;
        self.release().await?;
        Ok(out)
    }

    /// Runs `f` holding the writer lease, blocking for it per `settings`.
    pub async fn run_blocking<F, T>(
        &self,
        f: F,
        settings: BlockingSettings,
    ) -> Result<Option<T>, SharedLockError>
    where
        F: Future<Output = T>,
    {
        if !self.acquire_blocking(settings).await? {
            return Ok(None);
        }
        let out = f.await;
        self.release().await?;
        Ok(Some(out))
    }

    async fn unavailable_reason(&self) -> Result<UnavailableReason, SharedLockError> {
        let writer = self
            .core
            .guard(self.core.adapter.writer_of(self.core.key.namespaced()))
            .await?;
        Ok(if writer.is_some() {
            UnavailableReason::WriterHeld
        } else {
            UnavailableReason::ReadersHeld
        })
    }
}

/// The shared side of a shared lock: one reader slot.
#[derive(Clone)]
pub struct ReaderLock {
    core: HandleCore,
    slot_id: String,
    limit: usize,
    ttl: Option<Duration>,
}

impl ReaderLock {
    pub(crate) fn from_parts(
        core: HandleCore,
        slot_id: String,
        limit: usize,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            core,
            slot_id,
            limit: limit.max(1),
            ttl,
        }
    }

    /// This handle's slot identity.
    pub fn slot_id(&self) -> &str {
        &self.slot_id
    }

    /// The reader limit this handle acquires under.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The serializable identity of this handle.
    pub fn state(&self) -> ReaderState {
        ReaderState {
            key: self.core.key.clone(),
            slot_id: self.slot_id.clone(),
            limit: self.limit,
            ttl_ms: self.ttl.map(|ttl| ttl.as_millis() as u64),
        }
    }

    /// Claims a reader slot. `false` means a writer holds the key or the
    /// reader limit is reached.
    pub async fn acquire(&self) -> Result<bool, SharedLockError> {
        let acquired = self
            .core
            .guard(self.core.adapter.acquire_reader(
                self.core.key.namespaced(),
                &self.slot_id,
                self.limit,
                self.ttl,
            ))
            .await?;
        let (pattern_name, timestamp) = self.core.base();
        if acquired {
            self.core.emit(SharedLockEvent::Acquired {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Reader,
                holder: self.slot_id.clone(),
            });
        } else {
            let reason = self.unavailable_reason().await?;

            #[cfg(feature = "tracing")]
            tracing::debug!(key = %self.core.key, %reason, "reader acquisition refused");

            self.core.emit(SharedLockEvent::Unavailable {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Reader,
                reason,
            });
        }
        Ok(acquired)
    }

    /// Claims a slot or fails with [`SharedLockError::Unavailable`].
    pub async fn acquire_or_fail(&self) -> Result<(), SharedLockError> {
        if self.acquire().await? {
            Ok(())
        } else {
            Err(SharedLockError::Unavailable {
                key: self.core.key.original().to_string(),
                reason: self.unavailable_reason().await?,
            })
        }
    }

    /// Retries `acquire` every `settings.interval` until success or
    /// `settings.time` has elapsed.
    pub async fn acquire_blocking(
        &self,
        settings: BlockingSettings,
    ) -> Result<bool, SharedLockError> {
        let started = Instant::now();
        loop {
            if self.acquire().await? {
                return Ok(true);
            }
            if started.elapsed() + settings.interval >= settings.time {
                return Ok(false);
            }
            tokio::time::sleep(settings.interval).await;
        }
    }

    /// Releases this reader slot. `false` means the slot is not held.
    pub async fn release(&self) -> Result<bool, SharedLockError> {
        let released = self
            .core
            .guard(
                self.core
                    .adapter
                    .release_reader(self.core.key.namespaced(), &self.slot_id),
            )
            .await?;
        let (pattern_name, timestamp) = self.core.base();
        let event = if released {
            SharedLockEvent::Released {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Reader,
                holder: self.slot_id.clone(),
            }
        } else {
            SharedLockEvent::FailedRelease {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Reader,
                holder: self.slot_id.clone(),
            }
        };
        self.core.emit(event);
        Ok(released)
    }

    /// Releases the slot or fails with [`SharedLockError::UnownedRelease`].
    pub async fn release_or_fail(&self) -> Result<(), SharedLockError> {
        if self.release().await? {
            Ok(())
        } else {
            Err(SharedLockError::UnownedRelease {
                key: self.core.key.original().to_string(),
                side: Side::Reader,
            })
        }
    }

    /// Extends this slot's lease by the handle's TTL. Non-expiring slots
    /// report `false`.
    pub async fn refresh(&self) -> Result<bool, SharedLockError> {
        let Some(ttl) = self.ttl else {
            return Ok(false);
        };
        self.refresh_with(ttl).await
    }

    /// Extends this slot's lease by an explicit TTL.
    pub async fn refresh_with(&self, ttl: Duration) -> Result<bool, SharedLockError> {
        let refreshed = self
            .core
            .guard(self.core.adapter.refresh_reader(
                self.core.key.namespaced(),
                &self.slot_id,
                ttl,
            ))
            .await?;
        let (pattern_name, timestamp) = self.core.base();
        let event = if refreshed {
            SharedLockEvent::Refreshed {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Reader,
                holder: self.slot_id.clone(),
            }
        } else {
            SharedLockEvent::FailedRefresh {
                pattern_name,
                timestamp,
                key: self.core.key.original().to_string(),
                side: Side::Reader,
                holder: self.slot_id.clone(),
            }
        };
        self.core.emit(event);
        Ok(refreshed)
    }

    /// Refreshes the slot or fails with [`SharedLockError::UnownedRefresh`].
    pub async fn refresh_or_fail(&self) -> Result<(), SharedLockError> {
        if self.refresh().await? {
            Ok(())
        } else {
            Err(SharedLockError::UnownedRefresh {
                key: self.core.key.original().to_string(),
                side: Side::Reader,
            })
        }
    }

    /// Runs `f` holding a reader slot; released on the way out.
    pub async fn run<F, T>(&self, f: F) -> Result<Option<T>, SharedLockError>
    where
        F: Future<Output = T>,
    {
        if !self.acquire().await? {
            return Ok(None);
        }
        let out = f.await;
        self.release().await?;
        Ok(Some(out))
    }

    /// Runs `f` holding a reader slot or fails with
    /// [`SharedLockError::Unavailable`].
    pub async fn run_or_fail<F, T>(&self, f: F) -> Result<T, SharedLockError>
    where
        F: Future<Output = T>,
    {
        self.acquire_or_fail().await?;
        let out = f.await;
        self.release().await?;
        Ok(out)
    }

    /// Runs `f` holding a reader slot, blocking for one per `settings`.
    pub async fn run_blocking<F, T>(
        &self,
        f: F,
        settings: BlockingSettings,
    ) -> Result<Option<T>, SharedLockError>
    where
        F: Future<Output = T>,
    {
        if !self.acquire_blocking(settings).await? {
            return Ok(None);
        }
        let out = f.await;
        self.release().await?;
        Ok(Some(out))
    }

    async fn unavailable_reason(&self) -> Result<UnavailableReason, SharedLockError> {
        let writer = self
            .core
            .guard(self.core.adapter.writer_of(self.core.key.namespaced()))
            .await?;
        Ok(if writer.is_some() {
            UnavailableReason::WriterHeld
        } else {
            UnavailableReason::ReaderLimitReached
        })
    }
}

impl std::fmt::Debug for SharedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLock")
            .field("key", &self.core.key)
            .field("default_limit", &self.default_limit)
            .finish_non_exhaustive()
    }
}
