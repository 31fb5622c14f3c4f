//! The shared lock provider.

use std::sync::Arc;
use std::time::Duration;

use breakwater_core::events::{EventListeners, FnListener};
use breakwater_core::namespace::{Namespace, NamespaceError};

use crate::adapter::SharedLockAdapter;
use crate::events::SharedLockEvent;
use crate::handles::{HandleCore, ReaderLock, ReaderState, SharedLock, WriterLock, WriterState};

/// Produces [`SharedLock`] handles sharing one adapter, namespace, default
/// TTL, default reader limit and event listener set.
#[derive(Clone)]
pub struct SharedLockProvider {
    adapter: Arc<dyn SharedLockAdapter>,
    namespace: Namespace,
    default_ttl: Option<Duration>,
    default_limit: usize,
    event_listeners: EventListeners<SharedLockEvent>,
    name: String,
}

/// Builder for [`SharedLockProvider`].
pub struct SharedLockProviderBuilder {
    adapter: Arc<dyn SharedLockAdapter>,
    namespace: Option<Namespace>,
    default_ttl: Option<Duration>,
    default_limit: usize,
    event_listeners: EventListeners<SharedLockEvent>,
    name: String,
}

impl SharedLockProviderBuilder {
    /// Creates a builder around an adapter.
    ///
    /// Defaults:
    /// - namespace root: `"shared-lock"`
    /// - default TTL: 5 minutes
    /// - default reader limit: `usize::MAX` (effectively unbounded)
    pub fn new(adapter: Arc<dyn SharedLockAdapter>) -> Self {
        Self {
            adapter,
            namespace: None,
            default_ttl: Some(Duration::from_secs(300)),
            default_limit: usize::MAX,
            event_listeners: EventListeners::new(),
            name: "shared-lock".to_string(),
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

    /// Makes leases non-expiring by default.
    pub fn no_default_ttl(mut self) -> Self {
        self.default_ttl = None;
        self
    }

    /// Sets the reader limit applied to reader handles created without an
    /// explicit limit.
    pub fn default_reader_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Sets the provider name used in events.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a listener receiving every shared lock event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&SharedLockEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the provider.
    pub fn build(self) -> SharedLockProvider {
        let namespace = self
            .namespace
            .unwrap_or_else(|| Namespace::new("shared-lock").expect("default namespace is valid"));
        SharedLockProvider {
            adapter: self.adapter,
            namespace,
            default_ttl: self.default_ttl,
            default_limit: self.default_limit,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl SharedLockProvider {
    /// Creates a builder around an adapter.
    pub fn builder(adapter: Arc<dyn SharedLockAdapter>) -> SharedLockProviderBuilder {
        SharedLockProviderBuilder::new(adapter)
    }

    /// Creates a handle for one key.
    pub fn create(&self, key: &str) -> Result<SharedLock, NamespaceError> {
        Ok(SharedLock {
            core: HandleCore {
                adapter: Arc::clone(&self.adapter),
                event_listeners: self.event_listeners.clone(),
                provider_name: self.name.clone(),
                key: self.namespace.create(key)?,
            },
            default_ttl: self.default_ttl,
            default_limit: self.default_limit,
        })
    }

    /// Rebuilds a writer handle from its serialized state, preserving
    /// owner identity.
    pub fn writer_from_state(&self, state: WriterState) -> WriterLock {
        let shared = SharedLock {
            core: HandleCore {
                adapter: Arc::clone(&self.adapter),
                event_listeners: self.event_listeners.clone(),
                provider_name: self.name.clone(),
                key: state.key,
            },
            default_ttl: state.ttl_ms.map(Duration::from_millis),
            default_limit: self.default_limit,
        };
        shared.writer_with_owner(state.owner)
    }

    /// Rebuilds a reader handle from its serialized state, preserving slot
    /// identity.
    pub fn reader_from_state(&self, state: ReaderState) -> ReaderLock {
        let core = HandleCore {
            adapter: Arc::clone(&self.adapter),
            event_listeners: self.event_listeners.clone(),
            provider_name: self.name.clone(),
            key: state.key,
        };
        ReaderLock::from_parts(
            core,
            state.slot_id,
            state.limit,
            state.ttl_ms.map(Duration::from_millis),
        )
    }
}
