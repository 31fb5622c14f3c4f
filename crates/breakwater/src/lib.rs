//! Composable resilience middleware and distributed coordination primitives
//! for async Rust.
//!
//! `breakwater` is a meta-crate: each pattern and provider lives in its own
//! crate and is re-exported here behind a feature flag.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! breakwater = { version = "0.1", features = ["retry", "lock"] }
//! ```
//!
//! # Resilience middleware (tower layers)
//!
//! - **retry** — backoff-driven retries that collect every attempt error
//! - **timeout** — wall-clock bounds with cancellation forwarding
//! - **bulkhead** — concurrency cap, queue capacity and interval pacing
//! - **hedge** — sequential fallback chains and parallel first-success races
//! - **circuitbreaker** — policy-driven breaker over pluggable storage
//!
//! # Coordination providers (storage-backed)
//!
//! - **lock** — distributed locks with TTL leases and serializable handles
//! - **semaphore** — slot-based bounded concurrency with per-slot leases
//! - **sharedlock** — reader/writer locks with rejection reasons
//! - **cache** — typed key-value caching with TTL
//!
//! Everything shares `breakwater-core`: the event system, backoff policies,
//! cancellation plumbing and key namespacing.

pub use breakwater_core as core;

#[cfg(feature = "bulkhead")]
pub use breakwater_bulkhead as bulkhead;

#[cfg(feature = "cache")]
pub use breakwater_cache as cache;

#[cfg(feature = "circuitbreaker")]
pub use breakwater_circuitbreaker as circuitbreaker;

#[cfg(feature = "hedge")]
pub use breakwater_hedge as hedge;

#[cfg(feature = "lock")]
pub use breakwater_lock as lock;

#[cfg(feature = "retry")]
pub use breakwater_retry as retry;

#[cfg(feature = "semaphore")]
pub use breakwater_semaphore as semaphore;

#[cfg(feature = "sharedlock")]
pub use breakwater_sharedlock as sharedlock;

#[cfg(feature = "timeout")]
pub use breakwater_timeout as timeout;
