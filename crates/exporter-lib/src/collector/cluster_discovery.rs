//! Discovered cluster gauges, including CA certificate validity

use super::gauge::{describe_all, families, GaugeSpec};
use super::{async_trait, MetricsCollector};
use crate::certificate::{validity_from_base64, CertificateValidity};
use crate::client::{paths, ApiClient};
use crate::convert::bool_label;
use crate::error::Result;
use crate::health::components;
use crate::models::ClusterDiscovery;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use tracing::{debug, error};

const SUBSYSTEM: &str = "cluster_discovery";

const CLUSTERS_TOTAL: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "clusters_total",
    "Total number of discovered clusters",
    &[],
);

const LABELS: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "labels",
    "Discovered cluster metadata carried as labels, always 1",
    &[
        "cloud_project_id",
        "cluster",
        "is_lxc",
        "location",
        "name",
        "plan_id",
        "provider",
    ],
);

const CA_CREATED: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "ca_created_timestamp",
    "Not-before time of the cluster CA certificate, seconds since the Unix epoch",
    &["cluster"],
);

const CA_EXPIRED: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "ca_expired_timestamp",
    "Not-after time of the cluster CA certificate, seconds since the Unix epoch",
    &["cluster"],
);

const SPECS: &[GaugeSpec] = &[CLUSTERS_TOTAL, LABELS, CA_CREATED, CA_EXPIRED];

pub struct ClusterDiscoveryCollector {
    client: ApiClient,
}

impl ClusterDiscoveryCollector {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsCollector for ClusterDiscoveryCollector {
    fn name(&self) -> &'static str {
        components::CLUSTER_DISCOVERY
    }

    fn describe(&self) -> Result<Vec<Desc>> {
        describe_all(SPECS)
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>> {
        let clusters: Vec<ClusterDiscovery> =
            self.client.fetch(paths::DISCOVERED_CLUSTERS, &[]).await?;
        debug!(component = SUBSYSTEM, clusters = clusters.len(), "Fetched discovered clusters");

        cluster_families(&clusters)
    }
}

/// Certificate problems never fail the cycle; they read as zero
fn ca_validity(cluster: &ClusterDiscovery, composite: &str) -> CertificateValidity {
    let Some(ca_data) = cluster.ca_data() else {
        debug!(component = SUBSYSTEM, cluster = %composite, "Cluster has no CA data");
        return CertificateValidity::default();
    };

    validity_from_base64(ca_data).unwrap_or_else(|e| {
        error!(
            component = SUBSYSTEM,
            cluster = %composite,
            error = %e,
            "Failed to read cluster CA certificate"
        );
        CertificateValidity::default()
    })
}

pub(crate) fn cluster_families(clusters: &[ClusterDiscovery]) -> Result<Vec<MetricFamily>> {
    let mut total = CLUSTERS_TOTAL.family();
    let mut labels = LABELS.family();
    let mut ca_created = CA_CREATED.family();
    let mut ca_expired = CA_EXPIRED.family();

    total.observe(&[], clusters.len() as f64)?;

    for cluster in clusters {
        let composite = cluster.composite_name();

        labels.observe(
            &[
                &cluster.provider.cloud_project_id,
                &composite,
                bool_label(cluster.is_lxc),
                &cluster.location,
                &cluster.name,
                &cluster.plan_id,
                &cluster.provider.name,
            ],
            1.0,
        )?;

        let validity = ca_validity(cluster, &composite);
        ca_created.observe(&[composite.as_str()], validity.not_before as f64)?;
        ca_expired.observe(&[composite.as_str()], validity.not_after as f64)?;
    }

    Ok(families([total, labels, ca_created, ca_expired]))
}
