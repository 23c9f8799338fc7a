//! Trap Metrics - Metrics and monitoring for the flash sandwich trap
//!
//! Provides Prometheus-compatible metrics for the monitoring loop and the
//! detection core it drives.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::OnceLock;

/// Global metrics registry
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Get or initialize the global registry
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Detection latency buckets (in seconds)
pub const DETECTION_BUCKETS: &[f64] = &[
    0.000001, // 1μs
    0.00001,  // 10μs
    0.0001,   // 100μs
    0.001,    // 1ms
    0.01,     // 10ms
    0.1,      // 100ms
];

fn register<C>(registry: &Registry, collector: &C)
where
    C: prometheus::core::Collector + Clone + 'static,
{
    if let Err(e) = registry.register(Box::new(collector.clone())) {
        tracing::debug!("Metric registration skipped: {}", e);
    }
}

/// Metrics shared by every [`TrapMetrics::new`] caller
static GLOBAL_METRICS: OnceLock<TrapMetrics> = OnceLock::new();

/// Metrics recorded by the monitoring loop
///
/// Clones share their underlying counters.
#[derive(Clone)]
pub struct TrapMetrics {
    pub blocks_processed: IntCounter,
    pub events_observed: IntCounterVec,
    pub qualifying_events: IntCounterVec,
    pub alerts: IntCounterVec,
    pub source_errors: IntCounterVec,
    pub window_depth: IntGauge,
    pub detection_seconds: Histogram,
}

impl TrapMetrics {
    /// Handle on the metrics registered in the global registry
    pub fn new() -> Self {
        GLOBAL_METRICS
            .get_or_init(|| Self::with_registry(registry()))
            .clone()
    }

    /// Fresh metrics registered in `registry`
    ///
    /// A registry that already holds these names keeps its first set; the
    /// returned metrics then count on their own.
    pub fn with_registry(registry: &Registry) -> Self {
        let blocks_processed = IntCounter::new(
            "trap_blocks_processed_total",
            "Total blocks appended to the correlation window",
        ).expect("Failed to create blocks_processed metric");

        let events_observed = IntCounterVec::new(
            Opts::new(
                "trap_events_observed_total",
                "Total events received from the chain data source",
            ),
            &["kind"],
        ).expect("Failed to create events_observed metric");

        let qualifying_events = IntCounterVec::new(
            Opts::new(
                "trap_qualifying_events_total",
                "Events meeting their detection threshold in an alerting window",
            ),
            &["kind"],
        ).expect("Failed to create qualifying_events metric");

        let alerts = IntCounterVec::new(
            Opts::new("trap_alerts_total", "Total sandwich alerts raised"),
            &["severity", "correlation"],
        ).expect("Failed to create alerts metric");

        let source_errors = IntCounterVec::new(
            Opts::new(
                "trap_source_errors_total",
                "Chain data source failures, treated as empty blocks",
            ),
            &["kind"],
        ).expect("Failed to create source_errors metric");

        let window_depth = IntGauge::new(
            "trap_window_depth",
            "Bundles currently held by the correlation window",
        ).expect("Failed to create window_depth metric");

        let detection_seconds = Histogram::with_opts(
            HistogramOpts::new("trap_detection_seconds", "Time spent in one detection pass")
                .buckets(DETECTION_BUCKETS.to_vec()),
        ).expect("Failed to create detection_seconds metric");

        register(registry, &blocks_processed);
        register(registry, &events_observed);
        register(registry, &qualifying_events);
        register(registry, &alerts);
        register(registry, &source_errors);
        register(registry, &window_depth);
        register(registry, &detection_seconds);

        Self {
            blocks_processed,
            events_observed,
            qualifying_events,
            alerts,
            source_errors,
            window_depth,
            detection_seconds,
        }
    }

    pub fn record_events(&self, flash_loans: usize, swaps: usize) {
        self.events_observed.with_label_values(&["flash_loan"]).inc_by(flash_loans as u64);
        self.events_observed.with_label_values(&["swap"]).inc_by(swaps as u64);
    }

    pub fn record_source_error(&self, kind: &str) {
        self.source_errors.with_label_values(&[kind]).inc();
    }

    pub fn record_alert(
        &self,
        severity: &str,
        correlation: &str,
        flash_loans: usize,
        swaps: usize,
    ) {
        self.alerts.with_label_values(&[severity, correlation]).inc();
        self.qualifying_events.with_label_values(&["flash_loan"]).inc_by(flash_loans as u64);
        self.qualifying_events.with_label_values(&["swap"]).inc_by(swaps as u64);
    }
}

impl Default for TrapMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Get metrics from a registry as Prometheus text format
pub fn gather_from(registry: &Registry) -> Result<String, prometheus::Error> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Get global metrics as Prometheus text format
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    gather_from(registry())
}
