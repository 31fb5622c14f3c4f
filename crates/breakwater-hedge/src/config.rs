use std::sync::Arc;
use std::time::Duration;

use breakwater_core::events::{EventListeners, FnListener};
use breakwater_core::signal::SignalBinder;
use futures::future::BoxFuture;

use crate::events::HedgeEvent;

/// Name of the primary candidate in events and error lists.
pub const PRIMARY_NAME: &str = "__primary";

/// A fallback candidate: an async function over the request.
pub type CandidateFn<Req, Res, E> =
    Arc<dyn Fn(Req) -> BoxFuture<'static, Result<Res, E>> + Send + Sync>;

/// Classifier deciding whether an `Ok` value counts as a failure; returning
/// `Some(error)` records the value as a failed attempt.
pub type ValueClassifier<Res, E> = Arc<dyn Fn(&Res) -> Option<E> + Send + Sync>;

/// How candidates are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HedgeMode {
    /// Try the primary, then each fallback in order.
    Sequential,
    /// Race every candidate; first value accepted by the policy wins.
    Parallel,
}

/// Configuration for the hedging middleware.
pub struct HedgeConfig<Req, Res, E> {
    pub(crate) mode: HedgeMode,
    pub(crate) wait_time: Duration,
    pub(crate) fallbacks: Vec<(String, CandidateFn<Req, Res, E>)>,
    pub(crate) value_classifier: Option<ValueClassifier<Res, E>>,
    pub(crate) signal_binder: Option<Arc<dyn SignalBinder<Req>>>,
    pub(crate) event_listeners: EventListeners<HedgeEvent>,
    pub(crate) name: String,
}

impl<Req, Res, E> HedgeConfig<Req, Res, E> {
    /// Candidate names in invocation order, primary first.
    pub(crate) fn candidate_names(&self) -> Vec<String> {
        std::iter::once(PRIMARY_NAME.to_string())
            .chain(self.fallbacks.iter().map(|(name, _)| name.clone()))
            .collect()
    }
}

/// Builder for [`HedgeConfig`].
pub struct HedgeConfigBuilder<Req, Res, E> {
    mode: HedgeMode,
    wait_time: Duration,
    fallbacks: Vec<(String, CandidateFn<Req, Res, E>)>,
    value_classifier: Option<ValueClassifier<Res, E>>,
    signal_binder: Option<Arc<dyn SignalBinder<Req>>>,
    event_listeners: EventListeners<HedgeEvent>,
    name: String,
}

impl<Req, Res, E> Default for HedgeConfigBuilder<Req, Res, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res, E> HedgeConfigBuilder<Req, Res, E> {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - mode: sequential
    /// - wait_time: 2s (parallel mode only)
    /// - no fallbacks (the primary is the wrapped service)
    pub fn new() -> Self {
        Self {
            mode: HedgeMode::Sequential,
            wait_time: Duration::from_secs(2),
            fallbacks: Vec::new(),
            value_classifier: None,
            signal_binder: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Selects sequential execution (the default).
    pub fn sequential(mut self) -> Self {
        self.mode = HedgeMode::Sequential;
        self
    }

    /// Selects parallel execution bounded by `wait_time` of wall clock.
    pub fn parallel(mut self, wait_time: Duration) -> Self {
        self.mode = HedgeMode::Parallel;
        self.wait_time = wait_time;
        self
    }

    /// Appends a fallback candidate named `fallback-N`.
    pub fn fallback<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Res, E>> + Send + 'static,
    {
        let name = format!("fallback-{}", self.fallbacks.len() + 1);
        self.fallback_named(name, f)
    }

    /// Appends a named fallback candidate.
    pub fn fallback_named<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Res, E>> + Send + 'static,
    {
        self.fallbacks
            .push((name.into(), Arc::new(move |req| Box::pin(f(req)))));
        self
    }

    /// Sets the value policy: an `Ok` value for which the classifier returns
    /// `Some(error)` is treated as a failed attempt.
    pub fn reject_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&Res) -> Option<E> + Send + Sync + 'static,
    {
        self.value_classifier = Some(Arc::new(f));
        self
    }

    /// Sets the signal binder used to thread cancellation through the
    /// request. In parallel mode each candidate receives its own child
    /// token; losers are cancelled.
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

    /// Registers a callback invoked before each candidate runs.
    pub fn on_attempt<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let HedgeEvent::AttemptStarted { candidate, .. } = event {
                f(candidate);
            }
        }));
        self
    }

    /// Registers a callback invoked when a candidate fails.
    pub fn on_attempt_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let HedgeEvent::AttemptFailed { candidate, .. } = event {
                f(candidate);
            }
        }));
        self
    }

    /// Builds the hedging layer.
    pub fn build(self) -> crate::HedgeLayer<Req, Res, E> {
        crate::HedgeLayer::new(HedgeConfig {
            mode: self.mode,
            wait_time: self.wait_time,
            fallbacks: self.fallbacks,
            value_classifier: self.value_classifier,
            signal_binder: self.signal_binder,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HedgeLayer;

    #[derive(Debug, Clone)]
    struct TestError;

    #[test]
    fn builder_defaults_to_sequential() {
        let _layer = HedgeLayer::<(), String, TestError>::builder().build();
    }

    #[test]
    fn fallbacks_are_auto_named_in_order() {
        let layer = HedgeLayer::<(), String, TestError>::builder()
            .fallback(|_req| async { Ok("a".to_string()) })
            .fallback(|_req| async { Ok("b".to_string()) })
            .fallback_named("replica-eu", |_req| async { Ok("c".to_string()) })
            .build();

        assert_eq!(
            layer.config().candidate_names(),
            vec!["__primary", "fallback-1", "fallback-2", "replica-eu"]
        );
    }
}
