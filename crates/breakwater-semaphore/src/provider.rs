//! The semaphore provider: a handle factory bound to an adapter and
//! namespace.

use std::sync::Arc;
use std::time::Duration;

use breakwater_core::events::{EventListeners, FnListener};
use breakwater_core::namespace::{Namespace, NamespaceError};
use uuid::Uuid;

use crate::adapter::SemaphoreAdapter;
use crate::events::SemaphoreEvent;
use crate::semaphore::{Semaphore, SemaphoreHandleState};

/// Produces [`Semaphore`] handles sharing one adapter, namespace, default
/// TTL, default limit and event listener set.
#[derive(Clone)]
pub struct SemaphoreProvider {
    adapter: Arc<dyn SemaphoreAdapter>,
    namespace: Namespace,
    default_ttl: Option<Duration>,
    default_limit: usize,
    event_listeners: EventListeners<SemaphoreEvent>,
    name: String,
}

/// Builder for [`SemaphoreProvider`].
pub struct SemaphoreProviderBuilder {
    adapter: Arc<dyn SemaphoreAdapter>,
    namespace: Option<Namespace>,
    default_ttl: Option<Duration>,
    default_limit: usize,
    event_listeners: EventListeners<SemaphoreEvent>,
    name: String,
}

impl SemaphoreProviderBuilder {
    /// Creates a builder around an adapter.
    ///
    /// Defaults:
    /// - namespace root: `"semaphore"`
    /// - default TTL: 5 minutes
    /// - default limit: 1
    pub fn new(adapter: Arc<dyn SemaphoreAdapter>) -> Self {
        Self {
            adapter,
            namespace: None,
            default_ttl: Some(Duration::from_secs(300)),
            default_limit: 1,
            event_listeners: EventListeners::new(),
            name: "semaphore".to_string(),
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

    /// Makes slot leases non-expiring by default.
    pub fn no_default_ttl(mut self) -> Self {
        self.default_ttl = None;
        self
    }

    /// Sets the limit applied to handles created without an explicit limit.
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Sets the provider name used in events.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for claimed slots.
    pub fn on_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let SemaphoreEvent::Acquired { key, slot_id, .. } = event {
                f(key, slot_id);
            }
        }));
        self
    }

    /// Registers a listener receiving every semaphore event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&SemaphoreEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the provider.
    pub fn build(self) -> SemaphoreProvider {
        let namespace = self
            .namespace
            .unwrap_or_else(|| Namespace::new("semaphore").expect("default namespace is valid"));
        SemaphoreProvider {
            adapter: self.adapter,
            namespace,
            default_ttl: self.default_ttl,
            default_limit: self.default_limit,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl SemaphoreProvider {
    /// Creates a builder around an adapter.
    pub fn builder(adapter: Arc<dyn SemaphoreAdapter>) -> SemaphoreProviderBuilder {
        SemaphoreProviderBuilder::new(adapter)
    }

    /// Creates a handle with a fresh slot identity and the default limit.
    pub fn create(&self, key: &str) -> Result<Semaphore, NamespaceError> {
        self.create_with_limit(key, self.default_limit)
    }

    /// Creates a handle with an explicit limit.
    pub fn create_with_limit(
        &self,
        key: &str,
        limit: usize,
    ) -> Result<Semaphore, NamespaceError> {
        Ok(Semaphore {
            adapter: Arc::clone(&self.adapter),
            event_listeners: self.event_listeners.clone(),
            provider_name: self.name.clone(),
            key: self.namespace.create(key)?,
            slot_id: Uuid::new_v4().to_string(),
            limit: limit.max(1),
            ttl: self.default_ttl,
        })
    }

    /// Rebuilds a handle from its serialized state, preserving slot
    /// identity.
    pub fn from_state(&self, state: SemaphoreHandleState) -> Semaphore {
        Semaphore {
            adapter: Arc::clone(&self.adapter),
            event_listeners: self.event_listeners.clone(),
            provider_name: self.name.clone(),
            key: state.key,
            slot_id: state.slot_id,
            limit: state.limit.max(1),
            ttl: state.ttl_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemorySemaphoreAdapter;
    use crate::error::SemaphoreError;
    use breakwater_core::blocking::BlockingSettings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn provider() -> SemaphoreProvider {
        SemaphoreProvider::builder(Arc::new(MemorySemaphoreAdapter::new()))
            .namespace(Namespace::new("test/semaphore").unwrap())
            .build()
    }

    #[tokio::test]
    async fn limit_bounds_concurrent_holders() {
        let provider = provider();
        let a = provider.create_with_limit("pool", 2).unwrap();
        let b = provider.create_with_limit("pool", 2).unwrap();
        let c = provider.create_with_limit("pool", 2).unwrap();

        assert!(a.acquire().await.unwrap());
        assert!(b.acquire().await.unwrap());
        assert!(!c.acquire().await.unwrap());
        assert_eq!(a.acquired_count().await.unwrap(), 2);
        assert_eq!(c.available_count().await.unwrap(), 0);

        assert!(a.release().await.unwrap());
        assert!(c.acquire().await.unwrap());
    }

    #[tokio::test]
    async fn or_fail_variants_map_to_typed_errors() {
        let provider = provider();
        let a = provider.create_with_limit("pool", 1).unwrap();
        let b = provider.create_with_limit("pool", 1).unwrap();

        a.acquire_or_fail().await.unwrap();
        assert!(matches!(
            b.acquire_or_fail().await.unwrap_err(),
            SemaphoreError::LimitReached { .. }
        ));
        assert!(matches!(
            b.release_or_fail().await.unwrap_err(),
            SemaphoreError::UnownedRelease { .. }
        ));
        assert!(matches!(
            b.refresh_or_fail().await.unwrap_err(),
            SemaphoreError::ExpiredRefresh { .. }
        ));
    }

    #[tokio::test]
    async fn run_releases_the_slot_on_the_way_out() {
        let provider = provider();
        let semaphore = provider.create_with_limit("pool", 1).unwrap();

        let out = semaphore.run(async { 7 }).await.unwrap();
        assert_eq!(out, Some(7));
        assert_eq!(semaphore.acquired_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn force_release_all_reports_whether_anything_existed() {
        let provider = provider();
        let a = provider.create_with_limit("pool", 2).unwrap();

        assert!(!a.force_release_all().await.unwrap());
        a.acquire_or_fail().await.unwrap();
        assert!(a.force_release_all().await.unwrap());
        assert_eq!(a.acquired_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn blocking_acquire_waits_for_a_free_slot() {
        let provider = provider();
        let holder = provider.create_with_limit("pool", 1).unwrap();
        let waiter = provider.create_with_limit("pool", 1).unwrap();

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
    async fn serialized_handles_release_the_original_slot() {
        let provider = provider();
        let original = provider.create_with_limit("pool", 1).unwrap();
        original.acquire_or_fail().await.unwrap();

        let json = serde_json::to_string(&original.state()).unwrap();
        let rebuilt = provider.from_state(serde_json::from_str(&json).unwrap());
        assert_eq!(rebuilt.slot_id(), original.slot_id());

        rebuilt.release_or_fail().await.unwrap();
        assert_eq!(original.acquired_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn events_fire_per_outcome() {
        let acquired = Arc::new(AtomicUsize::new(0));
        let limit_reached = Arc::new(AtomicUsize::new(0));
        let (a, l) = (Arc::clone(&acquired), Arc::clone(&limit_reached));

        let provider = SemaphoreProvider::builder(Arc::new(MemorySemaphoreAdapter::new()))
            .on_event(move |event| match event {
                SemaphoreEvent::Acquired { .. } => {
                    a.fetch_add(1, Ordering::SeqCst);
                }
                SemaphoreEvent::LimitReached { .. } => {
                    l.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            })
            .build();

        let first = provider.create_with_limit("pool", 1).unwrap();
        let second = provider.create_with_limit("pool", 1).unwrap();
        first.acquire().await.unwrap();
        second.acquire().await.unwrap();

        assert_eq!(acquired.load(Ordering::SeqCst), 1);
        assert_eq!(limit_reached.load(Ordering::SeqCst), 1);
    }
}
