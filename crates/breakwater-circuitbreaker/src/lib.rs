//! Policy-driven circuit breaker over pluggable storage adapters.
//!
//! The breaker is split into three layers:
//!
//! - **Policies** ([`ConsecutivePolicy`], [`CountWindowPolicy`],
//!   [`TimeSamplingPolicy`]) are pure: metrics in, transition decision out.
//! - **The state manager** ([`state::update_state`]) encodes the
//!   Closed/Open/HalfOpen/Isolated transition table, with reopen times
//!   produced by a [`BackoffPolicy`](breakwater_core::backoff::BackoffPolicy).
//! - **Storage** ([`CircuitBreakerStorage`]) persists state behind an atomic
//!   per-key read-modify-write, so breakers can be shared across processes.
//!
//! [`CircuitBreakerAdapter`] ties the three together at runtime and
//! [`CircuitBreakerLayer`] exposes run-or-fail semantics as Tower
//! middleware: a call against an `Open` or `Isolated` breaker is rejected
//! with [`CircuitBreakerError::Open`] / [`CircuitBreakerError::Isolated`]
//! without reaching the inner service.
//!
//! # Example
//!
//! ```
//! use breakwater_circuitbreaker::{CircuitBreakerLayer, CountWindowPolicy};
//! use tower::{Layer, service_fn};
//!
//! # async fn example() {
//! let layer = CircuitBreakerLayer::builder(
//!     CountWindowPolicy::new(100).with_failure_threshold(0.5),
//! )
//! .name("inventory")
//! .build();
//!
//! let svc = service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) });
//! let mut service = layer.layer(svc);
//! # }
//! ```

mod breaker;
mod classifier;
mod config;
mod error;
mod events;
pub mod policy;
pub mod state;
mod storage;

mod layer;
mod service;

pub use breaker::{CircuitBreakerAdapter, Transition};
pub use classifier::{DefaultClassifier, FailureClassifier, FnClassifier};
pub use config::CircuitBreakerConfigBuilder;
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;
pub use policy::{
    CircuitBreakerPolicy, ConsecutiveMetrics, ConsecutivePolicy, CountWindowMetrics,
    CountWindowPolicy, TimeSample, TimeSamplingMetrics, TimeSamplingPolicy,
};
pub use service::CircuitBreaker;
pub use state::{CircuitState, StateName};
pub use storage::{CircuitBreakerStorage, MemoryCircuitBreakerStorage, UpdateFn};
