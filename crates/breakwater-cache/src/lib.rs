//! Key-value caching with TTL over pluggable storage adapters.
//!
//! - [`CacheAdapter`] is the storage contract: get/add/put/update/increment/
//!   remove over JSON values, with expired entries behaving as absent.
//!   [`MemoryCacheAdapter`] is the single-process implementation over a
//!   concurrent map; [`DatabaseCacheAdapter`] lifts a row-shaped
//!   [`DatabaseCacheStore`] (`key, value TEXT, expires_at`) to the same
//!   contract, reclaiming expired rows lazily on read.
//! - [`Cache`] is the typed provider: any `Serialize + DeserializeOwned`
//!   value, namespaced keys, a default TTL, `get_or_fail`, increment/
//!   decrement and per-outcome events.
//!
//! # Example
//!
//! ```
//! use breakwater_cache::{Cache, MemoryCacheAdapter};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Cache::builder(Arc::new(MemoryCacheAdapter::new()))
//!     .default_ttl(Duration::from_secs(60))
//!     .build();
//!
//! cache.put("greeting", &"hello").await?;
//! let value: Option<String> = cache.get("greeting").await?;
//! assert_eq!(value.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

mod adapter;
mod cache;
mod database;
mod error;
mod events;
pub mod test_suite;

pub use adapter::{CacheAdapter, CacheEntry, MemoryCacheAdapter};
pub use cache::{Cache, CacheBuilder};
pub use database::{CacheRow, DatabaseCacheAdapter, DatabaseCacheStore};
pub use error::CacheError;
pub use events::CacheEvent;
