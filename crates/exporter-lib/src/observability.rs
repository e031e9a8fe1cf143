//! Observability for the exporter itself
//!
//! Provides:
//! - Prometheus self-metrics (per collector duration and failures, cached projects)
//! - Structured event logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Buckets for a scrape-time network round trip (seconds)
const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

static GLOBAL_METRICS: OnceLock<ExporterMetricsInner> = OnceLock::new();

struct ExporterMetricsInner {
    collector_duration_seconds: HistogramVec,
    collector_failures: IntCounterVec,
    cached_projects: IntGauge,
    scrapes: IntCounter,
}

impl ExporterMetricsInner {
    fn new() -> Self {
        Self {
            collector_duration_seconds: register_histogram_vec!(
                "lcp_exporter_collector_duration_seconds",
                "Time spent by one collector during a scrape",
                &["collector"],
                DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register collector_duration_seconds"),

            collector_failures: register_int_counter_vec!(
                "lcp_exporter_collector_failures_total",
                "Scrape cycles in which a collector emitted nothing because of an error",
                &["collector"]
            )
            .expect("Failed to register collector_failures_total"),

            cached_projects: register_int_gauge!(
                "lcp_exporter_cached_projects",
                "Number of projects held by the project directory"
            )
            .expect("Failed to register cached_projects"),

            scrapes: register_int_counter!(
                "lcp_exporter_scrapes_total",
                "Total number of scrapes served"
            )
            .expect("Failed to register scrapes_total"),
        }
    }
}

/// Handle to the exporter's self-metrics in the default registry.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct ExporterMetrics {
    _private: (),
}

impl std::fmt::Debug for ExporterMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterMetrics").finish()
    }
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ExporterMetricsInner {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new)
    }

    pub fn observe_collector_duration(&self, collector: &str, duration_secs: f64) {
        self.inner()
            .collector_duration_seconds
            .with_label_values(&[collector])
            .observe(duration_secs);
    }

    pub fn inc_collector_failures(&self, collector: &str) {
        self.inner()
            .collector_failures
            .with_label_values(&[collector])
            .inc();
    }

    pub fn collector_failures(&self, collector: &str) -> u64 {
        self.inner()
            .collector_failures
            .with_label_values(&[collector])
            .get()
    }

    pub fn set_cached_projects(&self, count: i64) {
        self.inner().cached_projects.set(count);
    }

    pub fn inc_scrapes(&self) {
        self.inner().scrapes.inc();
    }
}

/// Structured logger for exporter lifecycle events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    endpoint: String,
}

impl StructuredLogger {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn log_startup(&self, version: &str, listen: &str, metrics_path: &str) {
        info!(
            event = "exporter_started",
            endpoint = %self.endpoint,
            version = %version,
            listen = %listen,
            metrics_path = %metrics_path,
            "LCP exporter started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "exporter_shutdown",
            endpoint = %self.endpoint,
            reason = %reason,
            "LCP exporter shutting down"
        );
    }

    pub fn log_collector_registered(&self, collector: &str, enabled: bool) {
        if enabled {
            info!(
                event = "collector_registered",
                collector = %collector,
                "Registering collector"
            );
        } else {
            info!(
                event = "collector_disabled",
                collector = %collector,
                "Collector disabled by configuration"
            );
        }
    }

    pub fn log_collector_failed(&self, collector: &str, kind: &str, error: &str) {
        error!(
            event = "collector_failed",
            endpoint = %self.endpoint,
            collector = %collector,
            kind = %kind,
            error = %error,
            "Collector emitted nothing this cycle"
        );
    }

    pub fn log_parity_violation(&self, included: usize, subtotals: usize) {
        warn!(
            event = "autoscale_parity_violation",
            endpoint = %self.endpoint,
            included_child_ids = included,
            subtotals = subtotals,
            "Autoscale stats failed parity check, skipping cycle"
        );
    }
}
