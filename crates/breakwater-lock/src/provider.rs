//! The lock provider: a handle factory bound to an adapter and namespace.

use std::sync::Arc;
use std::time::Duration;

use breakwater_core::events::{EventListeners, FnListener};
use breakwater_core::namespace::{Namespace, NamespaceError};
use uuid::Uuid;

use crate::adapter::LockAdapter;
use crate::events::LockEvent;
use crate::lock::{Lock, LockState};

/// Produces [`Lock`] handles sharing one adapter, namespace, default TTL and
/// event listener set.
#[derive(Clone)]
pub struct LockProvider {
    adapter: Arc<dyn LockAdapter>,
    namespace: Namespace,
    default_ttl: Option<Duration>,
    event_listeners: EventListeners<LockEvent>,
    name: String,
}

/// Builder for [`LockProvider`].
pub struct LockProviderBuilder {
    adapter: Arc<dyn LockAdapter>,
    namespace: Option<Namespace>,
    default_ttl: Option<Duration>,
    event_listeners: EventListeners<LockEvent>,
    name: String,
}

impl LockProviderBuilder {
    /// Creates a builder around an adapter.
    ///
    /// Defaults:
    /// - namespace root: `"lock"`
    /// - default TTL: 5 minutes
    pub fn new(adapter: Arc<dyn LockAdapter>) -> Self {
        Self {
            adapter,
            namespace: None,
            default_ttl: Some(Duration::from_secs(300)),
            event_listeners: EventListeners::new(),
            name: "lock".to_string(),
        }
    }

    /// Sets the key namespace.
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Sets the TTL applied to handles created without an explicit TTL.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Makes handles non-expiring by default.
    pub fn no_default_ttl(mut self) -> Self {
        self.default_ttl = None;
        self
    }

    /// Sets the provider name used in events.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for acquired leases.
    pub fn on_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LockEvent::Acquired { key, owner, .. } = event {
                f(key, owner);
            }
        }));
        self
    }

    /// Registers a callback for released leases.
    pub fn on_released<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LockEvent::Released { key, owner, .. } = event {
                f(key, owner);
            }
        }));
        self
    }

    /// Registers a listener receiving every lock event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&LockEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the provider.
    pub fn build(self) -> LockProvider {
        let namespace = self
            .namespace
            .unwrap_or_else(|| Namespace::new("lock").expect("default namespace is valid"));
        LockProvider {
            adapter: self.adapter,
            namespace,
            default_ttl: self.default_ttl,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl LockProvider {
    /// Creates a builder around an adapter.
    pub fn builder(adapter: Arc<dyn LockAdapter>) -> LockProviderBuilder {
        LockProviderBuilder::new(adapter)
    }

    /// Creates a handle with a fresh owner identity and the default TTL.
    pub fn create(&self, key: &str) -> Result<Lock, NamespaceError> {
        self.create_with_owner(key, Uuid::new_v4().to_string())
    }

    /// Creates a handle with an explicit owner identity, for sharing one
    /// lease across processes.
    pub fn create_with_owner(
        &self,
        key: &str,
        owner: impl Into<String>,
    ) -> Result<Lock, NamespaceError> {
        Ok(Lock {
            adapter: Arc::clone(&self.adapter),
            event_listeners: self.event_listeners.clone(),
            provider_name: self.name.clone(),
            key: self.namespace.create(key)?,
            owner: owner.into(),
            ttl: self.default_ttl,
        })
    }

    /// Overrides the TTL for one handle.
    pub fn create_with_ttl(
        &self,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<Lock, NamespaceError> {
        let mut lock = self.create(key)?;
        lock.ttl = ttl;
        Ok(lock)
    }

    /// Rebuilds a handle from its serialized state, preserving owner
    /// identity. The key keeps the namespace it was created under.
    pub fn from_state(&self, state: LockState) -> Lock {
        Lock {
            adapter: Arc::clone(&self.adapter),
            event_listeners: self.event_listeners.clone(),
            provider_name: self.name.clone(),
            key: state.key,
            owner: state.owner,
            ttl: state.ttl_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryLockAdapter;
    use crate::error::LockError;
    use crate::lock::BlockingSettings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn provider() -> LockProvider {
        LockProvider::builder(Arc::new(MemoryLockAdapter::new()))
            .namespace(Namespace::new("test/lock").unwrap())
            .build()
    }

    #[tokio::test]
    async fn two_owners_one_key() {
        let provider = provider();
        let a = provider.create("job").unwrap();
        let b = provider.create("job").unwrap();

        assert!(a.acquire().await.unwrap());
        assert!(!b.acquire().await.unwrap());
        assert!(a.release().await.unwrap());
        assert!(b.acquire().await.unwrap());
    }

    #[tokio::test]
    async fn or_fail_variants_map_to_typed_errors() {
        let provider = provider();
        let a = provider.create("job").unwrap();
        let b = provider.create("job").unwrap();

        a.acquire_or_fail().await.unwrap();
        assert!(matches!(
            b.acquire_or_fail().await.unwrap_err(),
            LockError::KeyAlreadyAcquired { .. }
        ));
        assert!(matches!(
            b.release_or_fail().await.unwrap_err(),
            LockError::UnownedRelease { .. }
        ));
        assert!(matches!(
            b.refresh_or_fail().await.unwrap_err(),
            LockError::UnownedRefresh { .. }
        ));
    }

    #[tokio::test]
    async fn run_releases_on_the_way_out() {
        let provider = provider();
        let lock = provider.create("job").unwrap();

        let out = lock.run(async { 42 }).await.unwrap();
        assert_eq!(out, Some(42));
        assert!(!lock.is_locked().await.unwrap());

        // A second run succeeds because the first released.
        let out = lock.run_or_fail(async { "again" }).await.unwrap();
        assert_eq!(out, "again");
    }

    #[tokio::test]
    async fn run_skips_the_body_when_unavailable() {
        let provider = provider();
        let holder = provider.create("job").unwrap();
        let other = provider.create("job").unwrap();
        holder.acquire_or_fail().await.unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        let out = other
            .run(async move {
                r.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        assert!(out.is_none());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blocking_acquire_waits_for_release() {
        let provider = provider();
        let holder = provider.create("job").unwrap();
        let waiter = provider.create("job").unwrap();

        holder.acquire_or_fail().await.unwrap();
        let release = tokio::spawn({
            let holder = holder.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                holder.release().await.unwrap();
            }
        });

        let acquired = waiter
            .acquire_blocking(BlockingSettings::new(
                Duration::from_secs(5),
                Duration::from_millis(10),
            ))
            .await
            .unwrap();
        assert!(acquired);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn blocking_acquire_gives_up_within_the_budget() {
        let provider = provider();
        let holder = provider.create("job").unwrap();
        let waiter = provider.create("job").unwrap();
        holder.acquire_or_fail().await.unwrap();

        let started = std::time::Instant::now();
        let acquired = waiter
            .acquire_blocking(BlockingSettings::new(
                Duration::from_millis(80),
                Duration::from_millis(20),
            ))
            .await
            .unwrap();
        assert!(!acquired);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn serialized_handles_share_owner_identity() {
        let provider = provider();
        let original = provider.create("job").unwrap();
        original.acquire_or_fail().await.unwrap();

        let json = serde_json::to_string(&original.state()).unwrap();
        let rebuilt = provider.from_state(serde_json::from_str(&json).unwrap());

        assert_eq!(rebuilt.owner(), original.owner());
        // The rebuilt handle operates on the original lease.
        rebuilt.release_or_fail().await.unwrap();
        assert!(!original.is_locked().await.unwrap());
    }

    #[tokio::test]
    async fn events_fire_per_outcome() {
        let acquired = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let (a, r) = (Arc::clone(&acquired), Arc::clone(&released));

        let provider = LockProvider::builder(Arc::new(MemoryLockAdapter::new()))
            .on_acquired(move |_, _| {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .on_released(move |_, _| {
                r.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let lock = provider.create("job").unwrap();
        lock.acquire().await.unwrap();
        lock.release().await.unwrap();

        assert_eq!(acquired.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remaining_ttl_reflects_the_lease() {
        let provider = LockProvider::builder(Arc::new(MemoryLockAdapter::new()))
            .default_ttl(Duration::from_secs(60))
            .build();
        let lock = provider.create("job").unwrap();

        assert_eq!(lock.remaining_ttl().await.unwrap(), None);
        lock.acquire_or_fail().await.unwrap();
        let remaining = lock.remaining_ttl().await.unwrap().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(50));
    }
}
