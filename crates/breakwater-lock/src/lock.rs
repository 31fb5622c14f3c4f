//! The user-facing lock handle.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use breakwater_core::error::StorageError;
use breakwater_core::events::EventListeners;
use breakwater_core::namespace::Key;
use serde::{Deserialize, Serialize};

use crate::adapter::LockAdapter;
use crate::error::LockError;
use crate::events::LockEvent;

pub use breakwater_core::blocking::BlockingSettings;

/// The serializable identity of a lock handle.
///
/// Deserializing on another process yields a handle with the same owner, so
/// a lease taken on one node can be released or refreshed on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    pub key: Key,
    pub owner: String,
    pub ttl_ms: Option<u64>,
}

/// A handle on one lock key.
///
/// Cheap to clone; clones share the same owner identity.
#[derive(Clone)]
pub struct Lock {
    pub(crate) adapter: Arc<dyn LockAdapter>,
    pub(crate) event_listeners: EventListeners<LockEvent>,
    pub(crate) provider_name: String,
    pub(crate) key: Key,
    pub(crate) owner: String,
    pub(crate) ttl: Option<Duration>,
}

impl Lock {
    /// The key this handle locks.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// This handle's owner identity.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The TTL applied on acquire and refresh. `None` leases never expire.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// The serializable identity of this handle.
    pub fn state(&self) -> LockState {
        LockState {
            key: self.key.clone(),
            owner: self.owner.clone(),
            ttl_ms: self.ttl.map(|ttl| ttl.as_millis() as u64),
        }
    }

    /// Attempts to take the lease. `false` means someone else holds it.
    pub async fn acquire(&self) -> Result<bool, LockError> {
        let acquired = self
            .guard(self.adapter.acquire(self.key.namespaced(), &self.owner, self.ttl))
            .await?;
        if acquired {
            self.emit(|base| LockEvent::Acquired {
                pattern_name: base.0,
                timestamp: base.1,
                key: self.key.original().to_string(),
                owner: self.owner.clone(),
            });
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %self.key, owner = %self.owner, "lock not available");

            self.emit(|base| LockEvent::NotAvailable {
                pattern_name: base.0,
                timestamp: base.1,
                key: self.key.original().to_string(),
                owner: self.owner.clone(),
            });
        }
        Ok(acquired)
    }

    /// Takes the lease or fails with [`LockError::KeyAlreadyAcquired`].
    pub async fn acquire_or_fail(&self) -> Result<(), LockError> {
        if self.acquire().await? {
            Ok(())
        } else {
            Err(LockError::KeyAlreadyAcquired {
                key: self.key.original().to_string(),
            })
        }
    }

    /// Retries `acquire` every `settings.interval` until success or
    /// `settings.time` has elapsed.
    pub async fn acquire_blocking(&self, settings: BlockingSettings) -> Result<bool, LockError> {
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

    /// Blocking acquire that fails with [`LockError::KeyAlreadyAcquired`]
    /// when the time budget runs out.
    pub async fn acquire_blocking_or_fail(
        &self,
        settings: BlockingSettings,
    ) -> Result<(), LockError> {
        if self.acquire_blocking(settings).await? {
            Ok(())
        } else {
            Err(LockError::KeyAlreadyAcquired {
                key: self.key.original().to_string(),
            })
        }
    }

    /// Releases the lease. `false` means this owner does not hold it.
    pub async fn release(&self) -> Result<bool, LockError> {
        let released = self
            .guard(self.adapter.release(self.key.namespaced(), &self.owner))
            .await?;
        if released {
            self.emit(|base| LockEvent::Released {
                pattern_name: base.0,
                timestamp: base.1,
                key: self.key.original().to_string(),
                owner: self.owner.clone(),
            });
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %self.key, owner = %self.owner, "release refused");

            self.emit(|base| LockEvent::FailedRelease {
                pattern_name: base.0,
                timestamp: base.1,
                key: self.key.original().to_string(),
                owner: self.owner.clone(),
            });
        }
        Ok(released)
    }

    /// Releases the lease or fails with [`LockError::UnownedRelease`].
    pub async fn release_or_fail(&self) -> Result<(), LockError> {
        if self.release().await? {
            Ok(())
        } else {
            Err(LockError::UnownedRelease {
                key: self.key.original().to_string(),
            })
        }
    }

    /// Removes any lease on the key, regardless of owner.
    pub async fn force_release(&self) -> Result<bool, LockError> {
        let removed = self
            .guard(self.adapter.force_release(self.key.namespaced()))
            .await?;
        if removed {
            self.emit(|base| LockEvent::ForceReleased {
                pattern_name: base.0,
                timestamp: base.1,
                key: self.key.original().to_string(),
            });
        }
        Ok(removed)
    }

    /// Extends the lease by the handle's TTL. Non-expiring leases (`ttl` of
    /// `None`) report `false` since there is nothing to extend.
    pub async fn refresh(&self) -> Result<bool, LockError> {
        let Some(ttl) = self.ttl else {
            return Ok(false);
        };
        self.refresh_with(ttl).await
    }

    /// Extends the lease by an explicit TTL.
    pub async fn refresh_with(&self, ttl: Duration) -> Result<bool, LockError> {
        let refreshed = self
            .guard(self.adapter.refresh(self.key.namespaced(), &self.owner, ttl))
            .await?;
        if refreshed {
            self.emit(|base| LockEvent::Refreshed {
                pattern_name: base.0,
                timestamp: base.1,
                key: self.key.original().to_string(),
                owner: self.owner.clone(),
            });
        } else {
            self.emit(|base| LockEvent::FailedRefresh {
                pattern_name: base.0,
                timestamp: base.1,
                key: self.key.original().to_string(),
                owner: self.owner.clone(),
            });
        }
        Ok(refreshed)
    }

    /// Refreshes the lease or fails with [`LockError::UnownedRefresh`].
    pub async fn refresh_or_fail(&self) -> Result<(), LockError> {
        if self.refresh().await? {
            Ok(())
        } else {
            Err(LockError::UnownedRefresh {
                key: self.key.original().to_string(),
            })
        }
    }

    /// Runs `f` under the lock. Returns `Ok(None)` without running `f` when
    /// the lease is not available; the lease is released on the way out.
    pub async fn run<F, T>(&self, f: F) -> Result<Option<T>, LockError>
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

    /// Runs `f` under the lock or fails with
    /// [`LockError::KeyAlreadyAcquired`]; the lease is released on the way
    /// out.
    pub async fn run_or_fail<F, T>(&self, f: F) -> Result<T, LockError>
    where
        F: Future<Output = T>,
    {
        self.acquire_or_fail().await?;
        let out = f.await;
        self.release().await?;
        Ok(out)
    }

    /// Runs `f` under the lock, blocking for the lease per `settings`.
    pub async fn run_blocking<F, T>(
        &self,
        f: F,
        settings: BlockingSettings,
    ) -> Result<Option<T>, LockError>
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
    ) -> Result<T, LockError>
    where
        F: Future<Output = T>,
    {
        self.acquire_blocking_or_fail(settings).await?;
        let out = f.await;
        self.release().await?;
        Ok(out)
    }

    /// Whether any live lease exists on the key, regardless of owner.
    pub async fn is_locked(&self) -> Result<bool, LockError> {
        let record = self.guard(self.adapter.find(self.key.namespaced())).await?;
        Ok(matches!(record, Some(r) if !r.is_expired(SystemTime::now())))
    }

    /// Whether this handle's lease is no longer valid (expired, released or
    /// taken by someone else).
    pub async fn is_expired(&self) -> Result<bool, LockError> {
        let record = self.guard(self.adapter.find(self.key.namespaced())).await?;
        Ok(!matches!(
            record,
            Some(r) if r.owner == self.owner && !r.is_expired(SystemTime::now())
        ))
    }

    /// Time until this handle's lease expires. `None` for non-expiring
    /// leases and leases this owner does not hold.
    pub async fn remaining_ttl(&self) -> Result<Option<Duration>, LockError> {
        let record = self.guard(self.adapter.find(self.key.namespaced())).await?;
        let now = SystemTime::now();
        Ok(record
            .filter(|r| r.owner == self.owner && !r.is_expired(now))
            .and_then(|r| r.expires_at)
            .and_then(|at| at.duration_since(now).ok()))
    }

    fn emit<F>(&self, build: F)
    where
        F: FnOnce((String, Instant)) -> LockEvent,
    {
        self.event_listeners
            .emit(&build((self.provider_name.clone(), Instant::now())));
    }

    /// Propagates storage failures, emitting `UnexpectedError` first.
    async fn guard<T>(
        &self,
        fut: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, LockError> {
        match fut.await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.emit(|base| LockEvent::UnexpectedError {
                    pattern_name: base.0,
                    timestamp: base.1,
                    key: self.key.original().to_string(),
                    owner: self.owner.clone(),
                    message: err.to_string(),
                });
                Err(LockError::Storage(err))
            }
        }
    }
}

impl std::fmt::Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock")
            .field("key", &self.key)
            .field("owner", &self.owner)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
