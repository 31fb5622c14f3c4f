//! Core infrastructure for breakwater.
//!
//! This crate provides the shared functionality used across all breakwater
//! crates:
//! - Event system for observability
//! - Backoff policies (constant, linear, exponential, polynomial, jittered)
//! - Cancellation signal plumbing
//! - Deterministic key namespacing
//! - The opaque storage failure type adapters report

pub mod backoff;
pub mod blocking;
pub mod error;
pub mod events;
pub mod namespace;
pub mod signal;

pub use backoff::BackoffPolicy;
pub use blocking::BlockingSettings;
pub use error::StorageError;
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use namespace::{Key, Namespace, NamespaceError};
pub use signal::{CancellationToken, NoopBinder, SignalBinder};
