//! Liveness of the management API, from `GET /health-check`

use super::gauge::{describe_all, families, GaugeSpec};
use super::{async_trait, MetricsCollector};
use crate::client::{paths, ApiClient};
use crate::error::{ExporterError, Result};
use crate::health::components;
use crate::models::HealthCheck;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use tracing::debug;

const UP: GaugeSpec = GaugeSpec::new(
    "status",
    "up",
    "1 if the API reports itself up, 0 otherwise",
    &["status"],
);

pub struct UpCollector {
    client: ApiClient,
}

impl UpCollector {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsCollector for UpCollector {
    fn name(&self) -> &'static str {
        components::UP
    }

    fn describe(&self) -> Result<Vec<Desc>> {
        describe_all(&[UP])
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>> {
        let check: HealthCheck = match self.client.fetch_one(paths::HEALTH_CHECK, &[]).await {
            Ok(check) => check,
            Err(ExporterError::NotFound { .. }) => {
                debug!(component = "up", "No health-check record returned");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let value = if check.status == "up" { 1.0 } else { 0.0 };
        let mut gauge = UP.family();
        gauge.observe(&[&check.status], value)?;

        Ok(families([gauge]))
    }
}
