//! Scrape-time driver for all registered collectors

use super::MetricsCollector;
use crate::error::{ExporterError, Result};
use crate::health::HealthRegistry;
use crate::observability::{ExporterMetrics, StructuredLogger};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::error;

/// Runs every registered collector once per scrape.
///
/// Collectors run as separate tasks and are all joined before the scrape
/// output is assembled. A failing collector contributes nothing.
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn MetricsCollector>>,
    names: HashSet<String>,
    health: HealthRegistry,
    metrics: ExporterMetrics,
    logger: StructuredLogger,
    include_self_metrics: bool,
}

impl CollectorRegistry {
    pub fn new(health: HealthRegistry, logger: StructuredLogger) -> Self {
        Self {
            collectors: Vec::new(),
            names: HashSet::new(),
            health,
            metrics: ExporterMetrics::new(),
            logger,
            include_self_metrics: false,
        }
    }

    /// Append the exporter's own metrics to every scrape
    pub fn with_self_metrics(mut self, enabled: bool) -> Self {
        self.include_self_metrics = enabled;
        self
    }

    /// Add a collector; its family names must not clash with any already
    /// registered
    pub async fn register(&mut self, collector: Arc<dyn MetricsCollector>) -> Result<()> {
        let descs = collector.describe()?;
        if descs.iter().any(|d| self.names.contains(&d.fq_name)) {
            return Err(ExporterError::Metrics(prometheus::Error::AlreadyReg));
        }

        self.names.extend(descs.into_iter().map(|d| d.fq_name));
        self.health.register(collector.name()).await;
        self.collectors.push(collector);
        Ok(())
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Run all collectors and merge their output, sorted by family name
    pub async fn gather(&self) -> Vec<MetricFamily> {
        self.metrics.inc_scrapes();

        let mut tasks = JoinSet::new();
        for collector in &self.collectors {
            tasks.spawn(run_collector(
                Arc::clone(collector),
                self.health.clone(),
                self.metrics.clone(),
                self.logger.clone(),
            ));
        }

        let mut families = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(output) => families.extend(output),
                Err(e) => error!(error = %e, "Collector task aborted"),
            }
        }

        families.retain(|f| !f.get_metric().is_empty());
        if self.include_self_metrics {
            families.extend(prometheus::gather());
        }
        families.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        families
    }

    /// Gather and encode in the Prometheus text format
    pub async fn render(&self) -> Result<Vec<u8>> {
        let families = self.gather().await;
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(buffer)
    }
}

async fn run_collector(
    collector: Arc<dyn MetricsCollector>,
    health: HealthRegistry,
    metrics: ExporterMetrics,
    logger: StructuredLogger,
) -> Vec<MetricFamily> {
    let name = collector.name();
    let start = Instant::now();
    let result = collector.collect().await;
    metrics.observe_collector_duration(name, start.elapsed().as_secs_f64());

    match result {
        Ok(families) => {
            health.set_healthy(name).await;
            families
        }
        Err(e) => {
            metrics.inc_collector_failures(name);
            match &e {
                ExporterError::Parity {
                    included,
                    subtotals,
                } => logger.log_parity_violation(*included, *subtotals),
                _ => logger.log_collector_failed(name, e.kind(), &e.to_string()),
            }
            health.set_degraded(name, e.to_string()).await;
            Vec::new()
        }
    }
}
