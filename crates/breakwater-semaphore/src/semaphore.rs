//! The user-facing semaphore handle.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use breakwater_core::error::StorageError;
use breakwater_core::events::EventListeners;
use breakwater_core::namespace::Key;
use serde::{Deserialize, Serialize};

use crate::adapter::SemaphoreAdapter;
use crate::error::SemaphoreError;
use crate::events::SemaphoreEvent;

pub use breakwater_core::blocking::BlockingSettings;

/// The serializable identity of a semaphore handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreHandleState {
    pub key: Key,
    pub slot_id: String,
    pub limit: usize,
    pub ttl_ms: Option<u64>,
}

/// A handle on one slot of a semaphore key.
#[derive(Clone)]
pub struct Semaphore {
    pub(crate) adapter: Arc<dyn SemaphoreAdapter>,
    pub(crate) event_listeners: EventListeners<SemaphoreEvent>,
    pub(crate) provider_name: String,
    pub(crate) key: Key,
    pub(crate) slot_id: String,
    pub(crate) limit: usize,
    pub(crate) ttl: Option<Duration>,
}

impl Semaphore {
    /// The key this handle claims a slot of.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// This handle's slot identity.
    pub fn slot_id(&self) -> &str {
        &self.slot_id
    }

    /// The slot limit this handle acquires under.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The serializable identity of this handle.
    pub fn state(&self) -> SemaphoreHandleState {
        SemaphoreHandleState {
            key: self.key.clone(),
            slot_id: self.slot_id.clone(),
            limit: self.limit,
            ttl_ms: self.ttl.map(|ttl| ttl.as_millis() as u64),
        }
    }

    /// Claims a slot. `false` means every slot is taken.
    pub async fn acquire(&self) -> Result<bool, SemaphoreError> {
        let acquired = self
            .guard(self.adapter.acquire(
                self.key.namespaced(),
                &self.slot_id,
                self.limit,
                self.ttl,
            ))
            .await?;
        if acquired {
            self.emit(|(pattern_name, timestamp)| SemaphoreEvent::Acquired {
                pattern_name,
                timestamp,
                key: self.key.original().to_string(),
                slot_id: self.slot_id.clone(),
            });
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %self.key, limit = self.limit, "semaphore limit reached");

            self.emit(|(pattern_name, timestamp)| SemaphoreEvent::LimitReached {
                pattern_name,
                timestamp,
                key: self.key.original().to_string(),
                slot_id: self.slot_id.clone(),
            });
        }
        Ok(acquired)
    }

    /// Claims a slot or fails with [`SemaphoreError::LimitReached`].
    pub async fn acquire_or_fail(&self) -> Result<(), SemaphoreError> {
        if self.acquire().await? {
            Ok(())
        } else {
            Err(SemaphoreError::LimitReached {
                key: self.key.original().to_string(),
            })
        }
    }

    /// Retries `acquire` every `settings.interval` until success or
    /// `settings.time` has elapsed.
    pub async fn acquire_blocking(
        &self,
        settings: BlockingSettings,
    ) -> Result<bool, SemaphoreError> {
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

    /// Blocking acquire that fails with [`SemaphoreError::LimitReached`]
    /// when the time budget runs out.
    pub async fn acquire_blocking_or_fail(
        &self,
        settings: BlockingSettings,
    ) -> Result<(), SemaphoreError> {
        if self.acquire_blocking(settings).await? {
            Ok(())
        } else {
            Err(SemaphoreError::LimitReached {
                key: self.key.original().to_string(),
            })
        }
    }

    /// Releases this handle's slot. `false` means the slot is not held.
    pub async fn release(&self) -> Result<bool, SemaphoreError> {
        let released = self
            .guard(self.adapter.release(self.key.namespaced(), &self.slot_id))
            .await?;
        if released {
            self.emit(|(pattern_name, timestamp)| SemaphoreEvent::Released {
                pattern_name,
                timestamp,
                key: self.key.original().to_string(),
                slot_id: self.slot_id.clone(),
            });
        } else {
            self.emit(|(pattern_name, timestamp)| SemaphoreEvent::FailedRelease {
                pattern_name,
                timestamp,
                key: self.key.original().to_string(),
                slot_id: self.slot_id.clone(),
            });
        }
        Ok(released)
    }

    /// Releases the slot or fails with [`SemaphoreError::UnownedRelease`].
    pub async fn release_or_fail(&self) -> Result<(), SemaphoreError> {
        if self.release().await? {
            Ok(())
        } else {
            Err(SemaphoreError::UnownedRelease {
                key: self.key.original().to_string(),
            })
        }
    }

    /// Removes the whole semaphore, every slot included.
    pub async fn force_release_all(&self) -> Result<bool, SemaphoreError> {
        let has_released = self
            .guard(self.adapter.force_release_all(self.key.namespaced()))
            .await?;
        self.emit(|(pattern_name, timestamp)| SemaphoreEvent::AllForceReleased {
            pattern_name,
            timestamp,
            key: self.key.original().to_string(),
            has_released,
        });
        Ok(has_released)
    }

    /// Extends this slot's lease by the handle's TTL. Non-expiring slots
    /// report `false`.
    pub async fn refresh(&self) -> Result<bool, SemaphoreError> {
        let Some(ttl) = self.ttl else {
            return Ok(false);
        };
        self.refresh_with(ttl).await
    }

    /// Extends this slot's lease by an explicit TTL.
    pub async fn refresh_with(&self, ttl: Duration) -> Result<bool, SemaphoreError> {
        let refreshed = self
            .guard(
                self.adapter
                    .refresh(self.key.namespaced(), &self.slot_id, ttl),
            )
            .await?;
        if refreshed {
            self.emit(|(pattern_name, timestamp)| SemaphoreEvent::Refreshed {
                pattern_name,
                timestamp,
                key: self.key.original().to_string(),
                slot_id: self.slot_id.clone(),
            });
        } else {
            self.emit(|(pattern_name, timestamp)| SemaphoreEvent::FailedRefresh {
                pattern_name,
                timestamp,
                key: self.key.original().to_string(),
                slot_id: self.slot_id.clone(),
            });
        }
        Ok(refreshed)
    }

    /// Refreshes the slot or fails with [`SemaphoreError::ExpiredRefresh`].
    pub async fn refresh_or_fail(&self) -> Result<(), SemaphoreError> {
        if self.refresh().await? {
            Ok(())
        } else {
            Err(SemaphoreError::ExpiredRefresh {
                key: self.key.original().to_string(),
            })
        }
    }

    /// Runs `f` holding a slot. Returns `Ok(None)` without running `f` when
    /// no slot is free; the slot is released on the way out.
    pub async fn run<F, T>(&self, f: F) -> Result<Option<T>, SemaphoreError>
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

    /// Runs `f` holding a slot or fails with
    /// [`SemaphoreError::LimitReached`].
    pub async fn run_or_fail<F, T>(&self, f: F) -> Result<T, SemaphoreError>
    where
        F: Future<Output = T>,
    {
        self.acquire_or_fail().await?;
        let out = f.await;
        self.release().await?;
        Ok(out)
    }

    /// Runs `f` holding a slot, blocking for one per `settings`.
    pub async fn run_blocking<F, T>(
        &self,
        f: F,
        settings: BlockingSettings,
    ) -> Result<Option<T>, SemaphoreError>
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

    /// Blocking `run_or_fail`.
    pub async fn run_blocking_or_fail<F, T>(
        &self,
        f: F,
        settings: BlockingSettings,
    ) -> Result<T, SemaphoreError>
    where
        F: Future<Output = T>,
    {
        self.acquire_blocking_or_fail(settings).await?;
        let out = f.await;
        self.release().await?;
        Ok(out)
    }

    /// Number of live slots on this key.
    pub async fn acquired_count(&self) -> Result<usize, SemaphoreError> {
        self.guard(self.adapter.acquired_count(self.key.namespaced()))
            .await
    }

    /// Number of free slots under this handle's limit.
    pub async fn available_count(&self) -> Result<usize, SemaphoreError> {
        let acquired = self.acquired_count().await?;
        Ok(self.limit.saturating_sub(acquired))
    }

    fn emit<F>(&self, build: F)
    where
        F: FnOnce((String, Instant)) -> SemaphoreEvent,
    {
        self.event_listeners
            .emit(&build((self.provider_name.clone(), Instant::now())));
    }

    async fn guard<T>(
        &self,
        fut: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, SemaphoreError> {
        match fut.await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.emit(|(pattern_name, timestamp)| SemaphoreEvent::UnexpectedError {
                    pattern_name,
                    timestamp,
                    key: self.key.original().to_string(),
                    slot_id: self.slot_id.clone(),
                    message: err.to_string(),
                });
                Err(SemaphoreError::Storage(err))
            }
        }
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("key", &self.key)
            .field("slot_id", &self.slot_id)
            .field("limit", &self.limit)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
