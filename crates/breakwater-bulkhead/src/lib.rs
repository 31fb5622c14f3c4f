//! Bulkhead middleware for Tower services.
//!
//! A bulkhead bounds concurrent in-flight work sharing one pool:
//!
//! - at most `max_concurrency` calls execute in parallel,
//! - at most `max_capacity` calls wait in the queue — further calls are
//!   rejected with [`BulkheadError::CapacityFull`] without being enqueued,
//! - when an `interval` is configured, at most `max_concurrency` calls start
//!   per interval (token-bucket pacing).
//!
//! A queued call whose cancellation token fires is failed with
//! [`BulkheadError::Cancelled`] without ever touching the inner service.
//!
//! # Example
//!
//! ```
//! use breakwater_bulkhead::BulkheadLayer;
//! use tower::{Layer, service_fn};
//!
//! # async fn example() {
//! let layer = BulkheadLayer::<String>::builder()
//!     .max_concurrency(4)
//!     .max_capacity(100)
//!     .build();
//!
//! let svc = service_fn(|req: String| async move { Ok::<_, ()>(req) });
//! let mut service = layer.layer(svc);
//! # }
//! ```

mod config;
mod error;
mod events;
mod layer;
mod service;

pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::BulkheadError;
pub use events::BulkheadEvent;
pub use layer::BulkheadLayer;
pub use service::Bulkhead;
