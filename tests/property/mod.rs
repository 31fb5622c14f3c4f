//! Property-based tests for breakwater.

pub mod backoff;
pub mod cache;
pub mod circuit_breaker;
pub mod hedge;
pub mod lock;
pub mod namespace;
pub mod retry;
pub mod semaphore;
pub mod shared_lock;
