//! Distributed reader/writer locks composed from lock and semaphore lease
//! semantics.
//!
//! A key is in exactly one of three states: empty, writer-held, or
//! reader-held (one or more reader slots). [`SharedLockAdapter`] enforces
//! the exclusivity invariant inside every call: a live writer and a live
//! reader slot never coexist.
//!
//! [`SharedLockProvider`] produces [`SharedLock`] handles; a handle hands
//! out the side-specific [`WriterLock`] and [`ReaderLock`] handles with the
//! usual lease operations, `*_or_fail` variants, blocking acquisition,
//! `run*` combinators and serializable identities. Rejections carry an
//! [`UnavailableReason`] discriminating writer-held, readers-held and
//! reader-limit cases.
//!
//! # Example
//!
//! ```
//! use breakwater_sharedlock::{MemorySharedLockAdapter, SharedLockProvider};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider =
//!     SharedLockProvider::builder(Arc::new(MemorySharedLockAdapter::new())).build();
//! let shared = provider.create("config")?;
//!
//! let reader = shared.reader_with_limit(8);
//! if let Some(value) = reader.run(async { "read config" }).await? {
//!     println!("{value}");
//! }
//! # Ok(())
//! # }
//! ```

mod adapter;
mod error;
mod events;
mod handles;
mod provider;
pub mod test_suite;

pub use adapter::{MemorySharedLockAdapter, SharedLockAdapter, UnavailableReason};
pub use breakwater_core::blocking::BlockingSettings;
pub use error::{SharedLockError, Side};
pub use events::SharedLockEvent;
pub use handles::{ReaderLock, ReaderState, SharedLock, WriterLock, WriterState};
pub use provider::{SharedLockProvider, SharedLockProviderBuilder};
