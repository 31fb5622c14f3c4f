use std::sync::Arc;

use tower::Layer;

use crate::{Hedge, HedgeConfig};

/// A Tower [`Layer`] that hedges the wrapped service with fallback
/// candidates, sequentially or as a parallel race.
///
/// # Example
///
/// ```
/// use breakwater_hedge::HedgeLayer;
/// use std::time::Duration;
///
/// # #[derive(Debug, Clone)]
/// # struct MyError;
/// let layer = HedgeLayer::<String, String, MyError>::builder()
///     .parallel(Duration::from_millis(500))
///     .fallback(|req: String| async move { Ok(format!("replica: {req}")) })
///     .build();
/// ```
pub struct HedgeLayer<Req, Res, E> {
    config: Arc<HedgeConfig<Req, Res, E>>,
}

impl<Req, Res, E> Clone for HedgeLayer<Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<Req, Res, E> HedgeLayer<Req, Res, E> {
    /// Creates a new `HedgeLayer` from the given configuration.
    pub fn new(config: HedgeConfig<Req, Res, E>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a builder for configuring a hedging layer.
    pub fn builder() -> crate::HedgeConfigBuilder<Req, Res, E> {
        crate::HedgeConfigBuilder::new()
    }

    #[cfg(test)]
    pub(crate) fn config(&self) -> &HedgeConfig<Req, Res, E> {
        &self.config
    }
}

impl<S, Req, Res, E> Layer<S> for HedgeLayer<Req, Res, E> {
    type Service = Hedge<S, Req, Res, E>;

    fn layer(&self, service: S) -> Self::Service {
        Hedge::new(service, Arc::clone(&self.config))
    }
}
