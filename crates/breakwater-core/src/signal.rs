//! Cancellation signal plumbing.
//!
//! Middlewares thread a single [`CancellationToken`] from the outermost layer
//! to every suspension point: backoff sleeps, blocking acquisition loops and
//! hedging candidates all observe it. Dropping a future remains the backstop,
//! but a forwarded token lets the inner call stop work it has already started.
//!
//! A [`SignalBinder`] knows how to read and write the token inside a wrapped
//! request, so middleware composition can transparently hand cancellation to
//! the inner call without the caller changing its request type.

pub use tokio_util::sync::CancellationToken;

/// Reads and writes the cancellation token carried by a request.
pub trait SignalBinder<Req>: Send + Sync {
    /// Extracts the token from the request, if the request carries one.
    fn signal_of(&self, req: &Req) -> Option<CancellationToken>;

    /// Returns the request with `signal` installed as its token.
    fn forward(&self, req: Req, signal: CancellationToken) -> Req;
}

/// A binder for requests that do not carry a token.
///
/// With this binder, cancellation falls back to dropping the inner future.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBinder;

impl<Req> SignalBinder<Req> for NoopBinder {
    fn signal_of(&self, _req: &Req) -> Option<CancellationToken> {
        None
    }

    fn forward(&self, req: Req, _signal: CancellationToken) -> Req {
        req
    }
}

/// A binder built from a pair of closures.
pub struct FnBinder<G, F> {
    get: G,
    set: F,
}

impl<G, F> FnBinder<G, F> {
    /// Creates a binder from a getter and a setter.
    pub fn new(get: G, set: F) -> Self {
        Self { get, set }
    }
}

impl<Req, G, F> SignalBinder<Req> for FnBinder<G, F>
where
    G: Fn(&Req) -> Option<CancellationToken> + Send + Sync,
    F: Fn(Req, CancellationToken) -> Req + Send + Sync,
{
    fn signal_of(&self, req: &Req) -> Option<CancellationToken> {
        (self.get)(req)
    }

    fn forward(&self, req: Req, signal: CancellationToken) -> Req {
        (self.set)(req, signal)
    }
}
