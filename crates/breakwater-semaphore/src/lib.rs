//! Distributed semaphores: slot-based bounded concurrency with per-slot
//! TTL leases.
//!
//! The same three layers as the lock crate:
//!
//! - [`SemaphoreAdapter`] is the storage contract; the count-under-limit
//!   check and the slot insertion are one atomic step.
//!   [`MemorySemaphoreAdapter`] is the single-process implementation;
//!   [`DatabaseSemaphoreAdapter`] lifts a row-shaped
//!   [`DatabaseSemaphoreStore`] (a `(key, limit)` row plus a
//!   `(key, slot_id, expires_at)` slot table).
//! - [`SemaphoreProvider`] binds an adapter to a namespace, default TTL,
//!   default limit and event listeners.
//! - [`Semaphore`] is a handle on one slot: acquire/release/refresh with
//!   `*_or_fail` variants, blocking acquisition, `run*` combinators and a
//!   serializable identity ([`SemaphoreHandleState`]).
//!
//! # Example
//!
//! ```
//! use breakwater_semaphore::{MemorySemaphoreAdapter, SemaphoreProvider};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = SemaphoreProvider::builder(Arc::new(MemorySemaphoreAdapter::new())).build();
//! let semaphore = provider.create_with_limit("bulk-export", 3)?;
//!
//! if let Some(out) = semaphore.run(async { "exported" }).await? {
//!     println!("{out}");
//! }
//! # Ok(())
//! # }
//! ```

mod adapter;
mod database;
mod error;
mod events;
mod provider;
mod semaphore;
pub mod test_suite;

pub use adapter::{MemorySemaphoreAdapter, SemaphoreAdapter};
pub use database::{DatabaseSemaphoreAdapter, DatabaseSemaphoreStore};
pub use error::SemaphoreError;
pub use events::SemaphoreEvent;
pub use provider::{SemaphoreProvider, SemaphoreProviderBuilder};
pub use semaphore::{BlockingSettings, Semaphore, SemaphoreHandleState};
