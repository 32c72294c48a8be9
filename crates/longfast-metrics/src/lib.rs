//! Metrics infrastructure for the LongFast propagation simulator.
//!
//! Every metric the simulator emits is declared here as a const [`Metric`]
//! so names, units and labels live in one place. The `metrics` facade is
//! re-exported; nothing is recorded unless the embedding application installs
//! a recorder.
//!
//! # Example
//!
//! ```rust
//! use longfast_metrics::{metric_defs, metrics, SimPass};
//!
//! let labels = SimPass::Dry.labels();
//! metrics::counter!(metric_defs::TX_STARTED.name, &labels).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use longfast_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("longfast.sim.frames")
///     .with_description("Frames simulated")
///     .with_unit(Unit::Count)
///     .with_labels(&["pass"]);
///
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "longfast.sim.tx_started").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }

    /// Returns the unit as a human-readable string.
    pub fn unit_str(&self) -> &'static str {
        match self.unit {
            Some(Unit::Count) => "count",
            Some(Unit::Seconds) => "seconds",
            Some(Unit::Milliseconds) => "milliseconds",
            Some(Unit::Microseconds) => "microseconds",
            Some(Unit::Percent) => "percent",
            Some(_) => "other",
            None => "",
        }
    }
}

/// Which simulation pass a metric was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimPass {
    /// Estimation pass used to size the render pass.
    Dry,
    /// Frame-producing pass.
    Render,
}

impl SimPass {
    /// Returns the pass as a label value.
    pub const fn as_label(&self) -> &'static str {
        match self {
            SimPass::Dry => "dry",
            SimPass::Render => "render",
        }
    }

    /// Label set for metrics scoped to this pass.
    pub fn labels(&self) -> [(&'static str, &'static str); 1] {
        [("pass", self.as_label())]
    }
}

/// All metric definitions for the simulator.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Label keys present on every simulator metric.
    pub const PASS_LABELS: &[&str] = &["pass"];

    // ========================================================================
    // Transmission Metrics
    // ========================================================================

    /// Transmissions started by the scheduler.
    pub const TX_STARTED: Metric = Metric::counter("longfast.sim.tx_started")
        .with_description("Transmissions started by the scheduler")
        .with_unit(Unit::Count)
        .with_labels(PASS_LABELS);

    /// Transmissions that ended and were committed to the received state.
    pub const TX_FINISHED: Metric = Metric::counter("longfast.sim.tx_finished")
        .with_description("Transmissions that ended and were committed")
        .with_unit(Unit::Count)
        .with_labels(PASS_LABELS);

    /// On-air duration of each transmission including jitter.
    pub const TX_DURATION: Metric = Metric::histogram("longfast.sim.tx_duration_s")
        .with_description("On-air duration of each transmission including jitter")
        .with_unit(Unit::Seconds)
        .with_labels(PASS_LABELS);

    /// Transmissions currently on air.
    pub const TX_ACTIVE: Metric = Metric::gauge("longfast.sim.tx_active")
        .with_description("Transmissions currently on air")
        .with_unit(Unit::Count)
        .with_labels(PASS_LABELS);

    // ========================================================================
    // Coverage Metrics
    // ========================================================================

    /// Population covered by committed received cells.
    pub const POPULATION_REACHED: Metric = Metric::gauge("longfast.sim.population_reached")
        .with_description("Population covered by committed received cells")
        .with_labels(PASS_LABELS);

    /// Towers that have heard the broadcast.
    pub const TOWERS_REACHED: Metric = Metric::gauge("longfast.sim.towers_reached")
        .with_description("Towers that have heard the broadcast")
        .with_unit(Unit::Count)
        .with_labels(PASS_LABELS);

    // ========================================================================
    // Frame Metrics
    // ========================================================================

    /// Frames stepped by the simulator.
    pub const FRAMES_SIMULATED: Metric = Metric::counter("longfast.frames.simulated")
        .with_description("Frames stepped by the simulator")
        .with_unit(Unit::Count)
        .with_labels(PASS_LABELS);

    /// Render-pass frames whose state changed and need a fresh render.
    pub const FRAMES_RENDERED: Metric = Metric::counter("longfast.frames.rendered")
        .with_description("Render-pass frames that need a fresh render")
        .with_unit(Unit::Count)
        .with_labels(PASS_LABELS);

    /// Render-pass frames that can reuse the previous render.
    pub const FRAMES_REUSED: Metric = Metric::counter("longfast.frames.reused")
        .with_description("Render-pass frames that reuse the previous render")
        .with_unit(Unit::Count)
        .with_labels(PASS_LABELS);

    /// All metrics, in display order.
    pub const ALL: &[Metric] = &[
        TX_STARTED,
        TX_FINISHED,
        TX_DURATION,
        TX_ACTIVE,
        POPULATION_REACHED,
        TOWERS_REACHED,
        FRAMES_SIMULATED,
        FRAMES_RENDERED,
        FRAMES_REUSED,
    ];
}

/// Describes all metrics used by the simulator to the installed recorder.
///
/// The simulator itself never installs a recorder. An application that
/// embeds it and installs one calls this right after
/// `metrics::set_global_recorder` so units and descriptions are attached.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString};
    use std::sync::Mutex;

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::TX_STARTED.name, "longfast.sim.tx_started");
        assert_eq!(metric_defs::TX_STARTED.kind, MetricKind::Counter);
        assert_eq!(metric_defs::TX_DURATION.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::TX_DURATION.unit, Some(Unit::Seconds));
        assert_eq!(metric_defs::POPULATION_REACHED.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::POPULATION_REACHED.unit_str(), "");
    }

    #[test]
    fn test_all_metrics_are_pass_scoped() {
        assert_eq!(metric_defs::ALL.len(), 9);
        for metric in metric_defs::ALL {
            assert_eq!(metric.labels, metric_defs::PASS_LABELS, "{}", metric.name);
            assert!(!metric.description.is_empty(), "{}", metric.name);
        }
    }

    #[test]
    fn test_pass_labels() {
        assert_eq!(SimPass::Dry.labels(), [("pass", "dry")]);
        assert_eq!(SimPass::Render.as_label(), "render");
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::gauge("minimal");

        assert_eq!(MINIMAL.name, "minimal");
        assert_eq!(MINIMAL.kind, MetricKind::Gauge);
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.unit, None);
        assert_eq!(MINIMAL.labels, &[] as &[&str]);
    }

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: describing is a no-op and must not panic.
        describe_metrics();
    }

    /// Records descriptions only; registered handles are no-ops.
    #[derive(Default)]
    struct DescribingRecorder {
        described: Mutex<Vec<(String, MetricKind, Option<Unit>, String)>>,
    }

    impl DescribingRecorder {
        fn push(&self, key: KeyName, kind: MetricKind, unit: Option<Unit>, text: SharedString) {
            self.described.lock().unwrap().push((
                key.as_str().to_string(),
                kind,
                unit,
                text.to_string(),
            ));
        }
    }

    impl Recorder for DescribingRecorder {
        fn describe_counter(&self, key: KeyName, unit: Option<Unit>, text: SharedString) {
            self.push(key, MetricKind::Counter, unit, text);
        }

        fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, text: SharedString) {
            self.push(key, MetricKind::Gauge, unit, text);
        }

        fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, text: SharedString) {
            self.push(key, MetricKind::Histogram, unit, text);
        }

        fn register_counter(&self, _key: &Key, _metadata: &Metadata<'_>) -> Counter {
            Counter::noop()
        }

        fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_describe_metrics_reaches_installed_recorder() {
        let recorder = DescribingRecorder::default();
        metrics::with_local_recorder(&recorder, describe_metrics);

        let described = recorder.described.into_inner().unwrap();
        assert_eq!(described.len(), metric_defs::ALL.len());
        for (metric, (name, kind, unit, text)) in metric_defs::ALL.iter().zip(&described) {
            assert_eq!(name, metric.name);
            assert_eq!(*kind, metric.kind);
            assert_eq!(*unit, metric.unit);
            assert_eq!(text, metric.description);
        }
    }
}
