//! Collectors deriving gauge metrics from management API responses
//!
//! Each collector performs one network round trip per scrape and turns the
//! decoded records into a fixed set of gauge families. A cycle either emits
//! its full set or nothing: errors bubble up to [`CollectorRegistry`], which
//! logs them and drops that collector's output for the scrape.

mod autoscale;
mod cluster_discovery;
mod gauge;
mod info;
mod projects;
mod registry;
mod up;


pub use autoscale::AutoscaleCollector;
pub use cluster_discovery::ClusterDiscoveryCollector;
pub use gauge::{describe_all, families, GaugeFamily, GaugeSpec, NAMESPACE};
pub use info::InfoCollector;
pub use projects::ProjectsCollector;
pub use registry::CollectorRegistry;
pub use up::UpCollector;

use crate::error::Result;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;

pub use async_trait::async_trait;

/// A source of gauge families, invoked once per scrape
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Name used for logging, health tracking and self-metrics
    fn name(&self) -> &'static str;

    /// Label schema of every family this collector can emit
    fn describe(&self) -> Result<Vec<Desc>>;

    /// Fetch and derive this cycle's observations
    async fn collect(&self) -> Result<Vec<MetricFamily>>;
}
