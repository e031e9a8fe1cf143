//! Build information of the management API, from `GET /`

use super::gauge::{describe_all, families, GaugeSpec};
use super::{async_trait, MetricsCollector};
use crate::client::{paths, ApiClient};
use crate::error::{ExporterError, Result};
use crate::health::components;
use crate::models::Info;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use tracing::debug;

const INFO: GaugeSpec = GaugeSpec::new(
    "status",
    "info",
    "Management API version and domains, always 1",
    &["infrastructure_domain", "service_domain", "version"],
);

pub struct InfoCollector {
    client: ApiClient,
}

impl InfoCollector {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsCollector for InfoCollector {
    fn name(&self) -> &'static str {
        components::INFO
    }

    fn describe(&self) -> Result<Vec<Desc>> {
        describe_all(&[INFO])
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>> {
        let info: Info = match self.client.fetch_one(paths::ROOT, &[]).await {
            Ok(info) => info,
            Err(ExporterError::NotFound { .. }) => {
                debug!(component = "info", "No info record returned");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut gauge = INFO.family();
        gauge.observe(
            &[
                &info.domains.infrastructure,
                &info.domains.service,
                &info.version,
            ],
            1.0,
        )?;

        Ok(families([gauge]))
    }
}
