//! The user-facing cache provider.

use std::sync::Arc;
use std::time::{Duration, Instant};

use breakwater_core::events::{EventListeners, FnListener};
use breakwater_core::namespace::{Namespace, NamespaceError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::adapter::CacheAdapter;
use crate::error::CacheError;
use crate::events::CacheEvent;

/// A typed cache over an adapter, namespace, default TTL and event
/// listener set.
///
/// Values serialize through `serde_json` at the adapter edge, so any
/// `Serialize + DeserializeOwned` type can be stored.
#[derive(Clone)]
pub struct Cache {
    adapter: Arc<dyn CacheAdapter>,
    namespace: Namespace,
    default_ttl: Option<Duration>,
    event_listeners: EventListeners<CacheEvent>,
    name: String,
}

/// Builder for [`Cache`].
pub struct CacheBuilder {
    adapter: Arc<dyn CacheAdapter>,
    namespace: Option<Namespace>,
    default_ttl: Option<Duration>,
    event_listeners: EventListeners<CacheEvent>,
    name: String,
}

impl CacheBuilder {
    /// Creates a builder around an adapter.
    ///
    /// Defaults:
    /// - namespace root: `"cache"`
    /// - default TTL: none (entries live forever unless given a TTL)
    pub fn new(adapter: Arc<dyn CacheAdapter>) -> Self {
        Self {
            adapter,
            namespace: None,
            default_ttl: None,
            event_listeners: EventListeners::new(),
            name: "cache".to_string(),
        }
    }

    /// Sets the key namespace.
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Sets the TTL applied to writes without an explicit TTL.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Sets the provider name used in events.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for cache hits.
    pub fn on_found<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Found { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback for cache misses.
    pub fn on_not_found<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::NotFound { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a listener receiving every cache event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the cache.
    pub fn build(self) -> Cache {
        let namespace = self
            .namespace
            .unwrap_or_else(|| Namespace::new("cache").expect("default namespace is valid"));
        Cache {
            adapter: self.adapter,
            namespace,
            default_ttl: self.default_ttl,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Cache {
    /// Creates a builder around an adapter.
    pub fn builder(adapter: Arc<dyn CacheAdapter>) -> CacheBuilder {
        CacheBuilder::new(adapter)
    }

    /// Returns the live value for `key`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let namespaced = self.namespaced(key)?;
        let found = self.adapter.get(&namespaced).await?;
        self.emit_read(key, found.is_some());
        found
            .map(|value| Self::decode(key, value))
            .transpose()
    }

    /// Returns the live value or fails with [`CacheError::KeyNotFound`].
    pub async fn get_or_fail<T: DeserializeOwned>(&self, key: &str) -> Result<T, CacheError> {
        self.get(key).await?.ok_or_else(|| CacheError::KeyNotFound {
            key: key.to_string(),
        })
    }

    /// Returns the live value and removes the entry.
    pub async fn get_and_remove<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        let namespaced = self.namespaced(key)?;
        let found = self.adapter.get_and_remove(&namespaced).await?;
        self.emit_read(key, found.is_some());
        if found.is_some() {
            self.emit(CacheEvent::Removed {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            });
        }
        found
            .map(|value| Self::decode(key, value))
            .transpose()
    }

    /// Whether a live entry exists.
    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let namespaced = self.namespaced(key)?;
        Ok(self.adapter.get(&namespaced).await?.is_some())
    }

    /// Writes iff no live entry exists, with the default TTL.
    pub async fn add<T: Serialize>(&self, key: &str, value: &T) -> Result<bool, CacheError> {
        self.add_with_ttl(key, value, self.default_ttl).await
    }

    /// Writes iff no live entry exists, with an explicit TTL (`None` lives
    /// forever).
    pub async fn add_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let namespaced = self.namespaced(key)?;
        let added = self
            .adapter
            .add(&namespaced, Self::encode(key, value)?, ttl)
            .await?;
        if added {
            self.emit(CacheEvent::Added {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            });
        }
        Ok(added)
    }

    /// Always writes, with the default TTL; returns `true` iff a live
    /// entry was replaced.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<bool, CacheError> {
        self.put_with_ttl(key, value, self.default_ttl).await
    }

    /// Always writes, with an explicit TTL; returns `true` iff a live
    /// entry was replaced.
    pub async fn put_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        let namespaced = self.namespaced(key)?;
        let replaced = self
            .adapter
            .put(&namespaced, Self::encode(key, value)?, ttl)
            .await?;
        self.emit(if replaced {
            CacheEvent::Updated {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            }
        } else {
            CacheEvent::Added {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            }
        });
        Ok(replaced)
    }

    /// Replaces a live entry's value, preserving its remaining expiration.
    pub async fn update<T: Serialize>(&self, key: &str, value: &T) -> Result<bool, CacheError> {
        let namespaced = self.namespaced(key)?;
        let updated = self
            .adapter
            .update(&namespaced, Self::encode(key, value)?)
            .await?;
        if updated {
            self.emit(CacheEvent::Updated {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            });
        }
        Ok(updated)
    }

    /// Adds `delta` to a live numeric entry.
    pub async fn increment(&self, key: &str, delta: i64) -> Result<bool, CacheError> {
        let namespaced = self.namespaced(key)?;
        let incremented = self.adapter.increment(&namespaced, delta).await?;
        if incremented {
            self.emit(CacheEvent::Incremented {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
                delta,
            });
        }
        Ok(incremented)
    }

    /// Subtracts `delta` from a live numeric entry.
    pub async fn decrement(&self, key: &str, delta: i64) -> Result<bool, CacheError> {
        self.increment(key, -delta).await
    }

    /// Removes an entry; returns `true` iff a live entry was removed.
    pub async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        self.remove_many(&[key.to_string()]).await
    }

    /// Removes entries; returns `true` iff any live entry was removed.
    pub async fn remove_many(&self, keys: &[String]) -> Result<bool, CacheError> {
        let namespaced = keys
            .iter()
            .map(|key| self.namespaced(key))
            .collect::<Result<Vec<_>, CacheError>>()?;
        let removed = self.adapter.remove_many(&namespaced).await?;
        if removed {
            for key in keys {
                self.emit(CacheEvent::Removed {
                    pattern_name: self.name.clone(),
                    timestamp: Instant::now(),
                    key: key.clone(),
                });
            }
        }
        Ok(removed)
    }

    /// Removes every entry under this cache's namespace.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.adapter
            .remove_by_key_prefix(&self.namespace.prefix())
            .await?;
        self.emit(CacheEvent::Cleared {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
        });
        Ok(())
    }

    fn namespaced(&self, key: &str) -> Result<String, CacheError> {
        self.namespace
            .create(key)
            .map(|key| key.namespaced().to_string())
            .map_err(|err| {
                CacheError::Storage(breakwater_core::error::StorageError::new(err.to_string()))
            })
    }

    fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, CacheError> {
        serde_json::to_value(value).map_err(|source| CacheError::Serialization {
            key: key.to_string(),
            source,
        })
    }

    fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, CacheError> {
        serde_json::from_value(value).map_err(|source| CacheError::Deserialization {
            key: key.to_string(),
            source,
        })
    }

    fn emit_read(&self, key: &str, found: bool) {
        #[cfg(feature = "tracing")]
        if !found {
            tracing::debug!(cache = %self.name, key, "cache miss");
        }

        self.emit(if found {
            CacheEvent::Found {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            }
        } else {
            CacheEvent::NotFound {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            }
        });
    }

    fn emit(&self, event: CacheEvent) {
        self.event_listeners.emit(&event);
    }
}
