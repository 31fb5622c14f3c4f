//! Distributed locks with TTL leases over pluggable storage adapters.
//!
//! Three layers:
//!
//! - [`LockAdapter`] is the storage contract: atomic
//!   acquire-if-absent-or-expired, owner-checked release and refresh.
//!   [`MemoryLockAdapter`] is the single-process implementation;
//!   [`DatabaseLockAdapter`] lifts any row-shaped [`DatabaseLockStore`]
//!   (SQL, MongoDB) to the same contract.
//! - [`LockProvider`] binds an adapter to a namespace, a default TTL and an
//!   event listener set, and produces handles.
//! - [`Lock`] is the handle: acquire/release/refresh with `*_or_fail`
//!   variants, blocking acquisition, `run*` combinators that release on the
//!   way out, and a serializable identity ([`LockState`]) so a lease taken
//!   on one node can be released on another.
//!
//! # Example
//!
//! ```
//! use breakwater_lock::{LockProvider, MemoryLockAdapter};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = LockProvider::builder(Arc::new(MemoryLockAdapter::new())).build();
//! let lock = provider.create("reindex")?;
//!
//! if let Some(report) = lock.run(async { "done" }).await? {
//!     println!("reindex ran: {report}");
//! }
//! # Ok(())
//! # }
//! ```

mod adapter;
mod database;
mod error;
mod events;
mod lock;
mod provider;
pub mod test_suite;

pub use adapter::{LockAdapter, LockRecord, MemoryLockAdapter};
pub use database::{DatabaseLockAdapter, DatabaseLockStore};
pub use error::LockError;
pub use events::LockEvent;
pub use lock::{BlockingSettings, Lock, LockState};
pub use provider::{LockProvider, LockProviderBuilder};
