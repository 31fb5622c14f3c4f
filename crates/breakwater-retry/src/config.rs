use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use breakwater_core::backoff::BackoffPolicy;
use breakwater_core::events::{EventListeners, FnListener};
use breakwater_core::signal::SignalBinder;

use crate::events::RetryEvent;

/// Predicate deciding whether an error should be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Source for the maximum number of attempts.
#[derive(Clone)]
pub enum MaxAttemptsSource<Req> {
    /// Fixed max attempts for all requests.
    Fixed(usize),
    /// Max attempts extracted from each request.
    Dynamic(Arc<dyn Fn(&Req) -> usize + Send + Sync>),
}

impl<Req> MaxAttemptsSource<Req> {
    pub(crate) fn get(&self, req: &Req) -> usize {
        match self {
            MaxAttemptsSource::Fixed(n) => *n,
            MaxAttemptsSource::Dynamic(f) => f(req),
        }
    }
}

impl<Req> Default for MaxAttemptsSource<Req> {
    fn default() -> Self {
        MaxAttemptsSource::Fixed(4)
    }
}

/// Source for the backoff applied after a failed attempt.
///
/// The dynamic form inspects the error and may return attempt-specific
/// settings; returning `None` falls back to the configured default policy.
#[derive(Clone)]
pub enum BackoffSource<E> {
    /// One policy for every error.
    Fixed(BackoffPolicy),
    /// Policy derived from the error, with a fallback default.
    Dynamic {
        settings: Arc<dyn Fn(&E) -> Option<BackoffPolicy> + Send + Sync>,
        default: BackoffPolicy,
    },
}

impl<E> BackoffSource<E> {
    pub(crate) fn policy_for(&self, error: &E) -> BackoffPolicy {
        match self {
            BackoffSource::Fixed(policy) => *policy,
            BackoffSource::Dynamic { settings, default } => settings(error).unwrap_or(*default),
        }
    }
}

impl<E> Default for BackoffSource<E> {
    fn default() -> Self {
        BackoffSource::Fixed(BackoffPolicy::default())
    }
}

/// Configuration for the retry middleware.
pub struct RetryConfig<Req, E> {
    pub(crate) max_attempts_source: MaxAttemptsSource<Req>,
    pub(crate) backoff_source: BackoffSource<E>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
    pub(crate) signal_binder: Option<Arc<dyn SignalBinder<Req>>>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<Req, E> {
    max_attempts_source: MaxAttemptsSource<Req>,
    backoff_source: BackoffSource<E>,
    retry_predicate: Option<RetryPredicate<E>>,
    signal_binder: Option<Arc<dyn SignalBinder<Req>>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
    _phantom: PhantomData<Req>,
}

impl<Req, E> Default for RetryConfigBuilder<Req, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, E> RetryConfigBuilder<Req, E> {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - max_attempts: 4
    /// - backoff: exponential from 100ms capped at 60s
    /// - every error is retried
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_attempts_source: MaxAttemptsSource::default(),
            backoff_source: BackoffSource::default(),
            retry_predicate: None,
            signal_binder: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
            _phantom: PhantomData,
        }
    }

    /// Sets a fixed maximum number of attempts, including the first.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts_source = MaxAttemptsSource::Fixed(max_attempts);
        self
    }

    /// Sets a per-request max attempts extractor.
    pub fn max_attempts_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Req) -> usize + Send + Sync + 'static,
    {
        self.max_attempts_source = MaxAttemptsSource::Dynamic(Arc::new(f));
        self
    }

    /// Sets the backoff policy applied between attempts.
    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff_source = BackoffSource::Fixed(policy);
        self
    }

    /// Shorthand for a constant backoff.
    pub fn fixed_backoff(self, delay: Duration) -> Self {
        self.backoff(BackoffPolicy::constant(delay))
    }

    /// Shorthand for an exponential backoff with the default cap.
    pub fn exponential_backoff(self, initial: Duration) -> Self {
        self.backoff(BackoffPolicy::exponential(initial, Duration::from_secs(60)))
    }

    /// Sets a per-error backoff settings function; `None` results fall back
    /// to `default`.
    pub fn backoff_fn<F>(mut self, default: BackoffPolicy, f: F) -> Self
    where
        F: Fn(&E) -> Option<BackoffPolicy> + Send + Sync + 'static,
    {
        self.backoff_source = BackoffSource::Dynamic {
            settings: Arc::new(f),
            default,
        };
        self
    }

    /// Sets the error policy: only errors for which the predicate returns
    /// `true` are retried.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the signal binder used to read a cancellation token out of the
    /// request. The token is observed between attempts and during backoff
    /// sleeps.
    pub fn signal_binder<B>(mut self, binder: B) -> Self
    where
        B: SignalBinder<Req> + 'static,
    {
        self.signal_binder = Some(Arc::new(binder));
        self
    }

    /// Sets the instance name used in events.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each attempt.
    pub fn on_attempt<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Attempt { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    /// Registers a callback invoked when a retry delay begins.
    pub fn on_delay<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Delay { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked on success with the attempt count.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when all attempts are exhausted.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when an error is not retried.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, RetryEvent::IgnoredError { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the retry layer.
    pub fn build(self) -> crate::RetryLayer<Req, E> {
        crate::RetryLayer::new(RetryConfig {
            max_attempts_source: self.max_attempts_source,
            backoff_source: self.backoff_source,
            retry_predicate: self.retry_predicate,
            signal_binder: self.signal_binder,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
