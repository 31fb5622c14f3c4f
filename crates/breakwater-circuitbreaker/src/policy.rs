//! Pure state-transition policies.
//!
//! A policy decides when a breaker opens and closes, based only on its
//! metrics and the current time. All I/O lives in the state manager and the
//! storage adapter, which keeps policies property-testable and portable to
//! server-side scripts.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Outcome of evaluating a closed breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedOutcome {
    /// Open the circuit.
    ToOpen,
    /// Stay closed.
    Stay,
}

/// Outcome of evaluating a half-open breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfOpenOutcome {
    /// Reopen the circuit.
    ToOpen,
    /// Close the circuit.
    ToClosed,
    /// Stay half-open.
    Stay,
}

/// The phase a tracked outcome was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    HalfOpen,
}

/// A pure circuit breaker policy over a serializable metrics type.
pub trait CircuitBreakerPolicy: Send + Sync + 'static {
    /// Per-policy call metrics, persisted inside the breaker state.
    type Metrics: Clone
        + std::fmt::Debug
        + Send
        + Sync
        + Serialize
        + DeserializeOwned
        + 'static;

    /// Metrics of a freshly closed or half-opened breaker.
    fn initial_metrics(&self) -> Self::Metrics;

    /// Evaluates a closed breaker.
    fn when_closed(&self, metrics: &Self::Metrics, now: SystemTime) -> ClosedOutcome;

    /// Evaluates a half-open breaker.
    fn when_half_opened(&self, metrics: &Self::Metrics, now: SystemTime) -> HalfOpenOutcome;

    /// Records a failed call.
    fn track_failure(&self, metrics: &mut Self::Metrics, phase: Phase, now: SystemTime);

    /// Records a successful call.
    fn track_success(&self, metrics: &mut Self::Metrics, phase: Phase, now: SystemTime);
}

// ---------------------------------------------------------------------------
// Consecutive
// ---------------------------------------------------------------------------

/// Opens after a run of consecutive failures; closes after a run of
/// consecutive successes while half-open.
#[derive(Debug, Clone, Copy)]
pub struct ConsecutivePolicy {
    failure_threshold: u32,
    success_threshold: u32,
}

/// Metrics for [`ConsecutivePolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsecutiveMetrics {
    pub failure_count: u32,
    pub success_count: u32,
}

impl ConsecutivePolicy {
    /// Creates a policy opening after `failure_threshold` consecutive
    /// failures. The success threshold defaults to the same value.
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            failure_threshold,
            success_threshold: failure_threshold,
        }
    }

    /// Overrides the number of half-open successes required to close.
    pub fn with_success_threshold(mut self, success_threshold: u32) -> Self {
        self.success_threshold = success_threshold;
        self
    }
}

impl Default for ConsecutivePolicy {
    fn default() -> Self {
        Self::new(5)
    }
}

impl CircuitBreakerPolicy for ConsecutivePolicy {
    type Metrics = ConsecutiveMetrics;

    fn initial_metrics(&self) -> Self::Metrics {
        ConsecutiveMetrics::default()
    }

    fn when_closed(&self, metrics: &Self::Metrics, _now: SystemTime) -> ClosedOutcome {
        if metrics.failure_count >= self.failure_threshold {
            ClosedOutcome::ToOpen
        } else {
            ClosedOutcome::Stay
        }
    }

    fn when_half_opened(&self, metrics: &Self::Metrics, _now: SystemTime) -> HalfOpenOutcome {
        if metrics.failure_count > 0 {
            HalfOpenOutcome::ToOpen
        } else if metrics.success_count >= self.success_threshold {
            HalfOpenOutcome::ToClosed
        } else {
            HalfOpenOutcome::Stay
        }
    }

    fn track_failure(&self, metrics: &mut Self::Metrics, _phase: Phase, _now: SystemTime) {
        metrics.failure_count += 1;
    }

    fn track_success(&self, metrics: &mut Self::Metrics, phase: Phase, _now: SystemTime) {
        match phase {
            // A success while closed resets the failure run.
            Phase::Closed => *metrics = ConsecutiveMetrics::default(),
            Phase::HalfOpen => metrics.success_count += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Count window
// ---------------------------------------------------------------------------

/// Opens when the failure share of the last `size` calls crosses a
/// threshold.
#[derive(Debug, Clone, Copy)]
pub struct CountWindowPolicy {
    size: usize,
    failure_threshold: f64,
    success_threshold: f64,
    minimum_calls: usize,
}

/// Metrics for [`CountWindowPolicy`]: a bounded queue of call outcomes,
/// `true` for success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountWindowMetrics {
    pub samples: VecDeque<bool>,
}

impl CountWindowMetrics {
    fn failures(&self) -> usize {
        self.samples.iter().filter(|success| !**success).count()
    }

    fn successes(&self) -> usize {
        self.samples.len() - self.failures()
    }
}

impl CountWindowPolicy {
    /// Creates a policy over a window of `size` calls.
    ///
    /// Defaults: failure threshold 0.5, success threshold 0.5, minimum
    /// calls 10.
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            failure_threshold: 0.5,
            success_threshold: 0.5,
            minimum_calls: 10,
        }
    }

    /// Failure share in `[0, 1]` above which a closed breaker opens.
    pub fn with_failure_threshold(mut self, threshold: f64) -> Self {
        self.failure_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Success share in `[0, 1]` above which a half-open breaker closes.
    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Calls required in the window before any transition.
    pub fn with_minimum_calls(mut self, minimum_calls: usize) -> Self {
        self.minimum_calls = minimum_calls;
        self
    }

    fn push(&self, metrics: &mut CountWindowMetrics, success: bool) {
        metrics.samples.push_back(success);
        while metrics.samples.len() > self.size {
            metrics.samples.pop_front();
        }
    }
}

impl CircuitBreakerPolicy for CountWindowPolicy {
    type Metrics = CountWindowMetrics;

    fn initial_metrics(&self) -> Self::Metrics {
        CountWindowMetrics::default()
    }

    fn when_closed(&self, metrics: &Self::Metrics, _now: SystemTime) -> ClosedOutcome {
        let total = metrics.samples.len();
        if total < self.minimum_calls {
            return ClosedOutcome::Stay;
        }
        if metrics.failures() > threshold_count(self.failure_threshold, total) {
            ClosedOutcome::ToOpen
        } else {
            ClosedOutcome::Stay
        }
    }

    fn when_half_opened(&self, metrics: &Self::Metrics, _now: SystemTime) -> HalfOpenOutcome {
        let total = metrics.samples.len();
        if total < self.minimum_calls {
            return HalfOpenOutcome::Stay;
        }
        if metrics.successes() > threshold_count(self.success_threshold, total) {
            HalfOpenOutcome::ToClosed
        } else {
            HalfOpenOutcome::ToOpen
        }
    }

    fn track_failure(&self, metrics: &mut Self::Metrics, _phase: Phase, _now: SystemTime) {
        self.push(metrics, false);
    }

    fn track_success(&self, metrics: &mut Self::Metrics, _phase: Phase, _now: SystemTime) {
        self.push(metrics, true);
    }
}

// ---------------------------------------------------------------------------
// Time sampling
// ---------------------------------------------------------------------------

/// Opens when the failure share over a trailing time window crosses a
/// threshold, with outcomes bucketed into sub-window samples.
#[derive(Debug, Clone, Copy)]
pub struct TimeSamplingPolicy {
    window: Duration,
    sample_window: Duration,
    failure_threshold: f64,
    success_threshold: f64,
    minimum_rps: f64,
}

/// One sub-window of outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSample {
    pub started_at: SystemTime,
    pub failures: u64,
    pub successes: u64,
}

/// Metrics for [`TimeSamplingPolicy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSamplingMetrics {
    pub samples: VecDeque<TimeSample>,
}

impl TimeSamplingMetrics {
    fn totals(&self) -> (u64, u64) {
        self.samples.iter().fold((0, 0), |(f, s), sample| {
            (f + sample.failures, s + sample.successes)
        })
    }
}

impl TimeSamplingPolicy {
    /// Creates a policy over a trailing `window`, bucketed into
    /// `sample_window` slices.
    ///
    /// Defaults: failure threshold 0.5, success threshold 0.5, minimum
    /// 1 call per second.
    pub fn new(window: Duration, sample_window: Duration) -> Self {
        Self {
            window,
            sample_window: sample_window.max(Duration::from_millis(1)),
            failure_threshold: 0.5,
            success_threshold: 0.5,
            minimum_rps: 1.0,
        }
    }

    /// Failure share in `[0, 1]` above which a closed breaker opens.
    pub fn with_failure_threshold(mut self, threshold: f64) -> Self {
        self.failure_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Success share in `[0, 1]` above which a half-open breaker closes.
    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Calls per second required in the window before any transition.
    pub fn with_minimum_rps(mut self, minimum_rps: f64) -> Self {
        self.minimum_rps = minimum_rps.max(0.0);
        self
    }

    /// Minimum total calls before the policy may transition.
    fn minimum_calls(&self) -> u64 {
        (self.minimum_rps * self.window.as_secs_f64().ceil()).ceil() as u64
    }

    /// Drops samples whose end lies before `now - window`.
    fn prune(&self, metrics: &mut TimeSamplingMetrics, now: SystemTime) {
        let Some(horizon) = now.checked_sub(self.window) else {
            return;
        };
        while let Some(front) = metrics.samples.front() {
            if front.started_at + self.sample_window < horizon {
                metrics.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn track(&self, metrics: &mut TimeSamplingMetrics, success: bool, now: SystemTime) {
        self.prune(metrics, now);
        let roll = match metrics.samples.back() {
            Some(last) => now >= last.started_at + self.sample_window,
            None => true,
        };
        if roll {
            metrics.samples.push_back(TimeSample {
                started_at: now,
                failures: 0,
                successes: 0,
            });
        }
        let last = metrics.samples.back_mut().expect("sample just ensured");
        if success {
            last.successes += 1;
        } else {
            last.failures += 1;
        }
    }
}

impl CircuitBreakerPolicy for TimeSamplingPolicy {
    type Metrics = TimeSamplingMetrics;

    fn initial_metrics(&self) -> Self::Metrics {
        TimeSamplingMetrics::default()
    }

    fn when_closed(&self, metrics: &Self::Metrics, now: SystemTime) -> ClosedOutcome {
        let mut pruned = metrics.clone();
        self.prune(&mut pruned, now);
        let (failures, successes) = pruned.totals();
        let total = failures + successes;
        if total < self.minimum_calls() {
            return ClosedOutcome::Stay;
        }
        if failures > threshold_count(self.failure_threshold, total as usize) as u64 {
            ClosedOutcome::ToOpen
        } else {
            ClosedOutcome::Stay
        }
    }

    fn when_half_opened(&self, metrics: &Self::Metrics, now: SystemTime) -> HalfOpenOutcome {
        let mut pruned = metrics.clone();
        self.prune(&mut pruned, now);
        let (failures, successes) = pruned.totals();
        let total = failures + successes;
        if total < self.minimum_calls() {
            return HalfOpenOutcome::Stay;
        }
        if successes > threshold_count(self.success_threshold, total as usize) as u64 {
            HalfOpenOutcome::ToClosed
        } else {
            HalfOpenOutcome::ToOpen
        }
    }

    fn track_failure(&self, metrics: &mut Self::Metrics, _phase: Phase, now: SystemTime) {
        self.track(metrics, false, now);
    }

    fn track_success(&self, metrics: &mut Self::Metrics, _phase: Phase, now: SystemTime) {
        self.track(metrics, true, now);
    }
}

/// `ceil(threshold * total)` as a count.
fn threshold_count(threshold: f64, total: usize) -> usize {
    (threshold * total as f64).ceil() as usize
}
