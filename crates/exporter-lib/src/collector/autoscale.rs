//! Autoscale cost and activity gauges from `/admin/reports/autoscale/stats`

use super::gauge::{describe_all, families, GaugeSpec};
use super::{async_trait, MetricsCollector};
use crate::client::{paths, ApiClient};
use crate::directory::{root_project_ids, ProjectDirectory};
use crate::error::{ExporterError, Result};
use crate::health::components;
use crate::models::AutoscaleStat;
use crate::window::DateWindow;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use tracing::{debug, info, warn};

const SUBSYSTEM: &str = "autoscale";

const BILLABLE_DURATION: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "billable_duration_ms",
    "Billable autoscale time in the reporting window, in milliseconds",
    &["project_name"],
);

const COST_AMOUNT: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "cost_amount",
    "Autoscale cost in the reporting window",
    &["currency_code", "project_name"],
);

const PRICE_AMOUNT: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "price_amount",
    "Autoscale unit price",
    &["currency_code", "project_name"],
);

const COST_DURATION: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "cost_duration_ms",
    "Total active autoscale time in the reporting window, in milliseconds",
    &["project_name"],
);

const SCALING_HISTORY: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "scaling_history_duration_ms",
    "Active time per additional instance of one scale-out, in milliseconds",
    &["ended_at", "instances", "project_name", "service_id", "started_at"],
);

const ACTIVATION_HISTORY: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "activation_history_count",
    "Maximum instances of a closed autoscale activation window, 0 while still open",
    &[
        "disabled_at",
        "disabled_by",
        "enabled_at",
        "enabled_by",
        "project_name",
        "service_id",
    ],
);

const SPECS: &[GaugeSpec] = &[
    BILLABLE_DURATION,
    COST_AMOUNT,
    PRICE_AMOUNT,
    COST_DURATION,
    SCALING_HISTORY,
    ACTIVATION_HISTORY,
];

/// Autoscale statistics for the root projects in the [`ProjectDirectory`]
pub struct AutoscaleCollector {
    client: ApiClient,
    directory: ProjectDirectory,
    window: DateWindow,
}

impl AutoscaleCollector {
    pub fn new(client: ApiClient, directory: ProjectDirectory, window: DateWindow) -> Self {
        Self {
            client,
            directory,
            window,
        }
    }
}

#[async_trait]
impl MetricsCollector for AutoscaleCollector {
    fn name(&self) -> &'static str {
        components::AUTOSCALE
    }

    fn describe(&self) -> Result<Vec<Desc>> {
        describe_all(SPECS)
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>> {
        let projects = self.directory.projects().await;
        if projects.is_empty() {
            info!(component = SUBSYSTEM, "No projects cached, skipping autoscale stats");
            return Ok(Vec::new());
        }

        let root_ids = root_project_ids(&projects);
        let range = self.window.current();
        debug!(
            component = SUBSYSTEM,
            root_projects = root_ids.len(),
            start = %range.start,
            end = %range.end,
            "Fetching autoscale stats"
        );

        let query = [
            ("start", range.start),
            ("end", range.end),
            ("projectIds", root_ids.join(",")),
        ];
        let stats: Vec<AutoscaleStat> = self.client.fetch(paths::AUTOSCALE_STATS, &query).await?;

        match stats.first() {
            Some(stat) => autoscale_families(stat),
            None => {
                info!(component = SUBSYSTEM, "No autoscale stats returned");
                Ok(Vec::new())
            }
        }
    }
}

/// Derive the autoscale families from one period's stats.
///
/// Fails with [`ExporterError::Parity`] before emitting anything when the
/// child id list and subtotal map do not pair up.
pub(crate) fn autoscale_families(stat: &AutoscaleStat) -> Result<Vec<MetricFamily>> {
    if !stat.passes_parity() {
        return Err(ExporterError::Parity {
            included: stat.included_child_project_ids.len(),
            subtotals: stat.subtotals_by_project_id.len(),
        });
    }

    let mut billable_duration = BILLABLE_DURATION.family();
    let mut cost_amount = COST_AMOUNT.family();
    let mut price_amount = PRICE_AMOUNT.family();
    let mut cost_duration = COST_DURATION.family();
    let mut scaling_history = SCALING_HISTORY.family();
    let mut activation_history = ACTIVATION_HISTORY.family();

    for project_id in &stat.included_child_project_ids {
        let Some(subtotal) = stat.subtotals_by_project_id.get(project_id) else {
            warn!(
                component = SUBSYSTEM,
                project_id = %project_id,
                "Included child project has no subtotal"
            );
            continue;
        };

        let id = project_id.as_str();
        billable_duration.observe(&[id], subtotal.billable_time_ms as f64)?;
        cost_amount.observe(&[&subtotal.cost.currency, id], subtotal.cost.amount)?;
        price_amount.observe(&[&subtotal.price.currency, id], subtotal.price.amount)?;
        cost_duration.observe(&[id], subtotal.total_active_time_ms as f64)?;
    }

    for event in &stat.scaling_history {
        scaling_history.observe(
            &[
                &event.ended_at.to_string(),
                &event.num_additional_instances.to_string(),
                &event.project_id,
                &event.service_id,
                &event.started_at.to_string(),
            ],
            event.active_time_per_instance_ms as f64,
        )?;
    }

    for event in &stat.activation_history {
        activation_history.observe(
            &[
                &event.disabled_at.to_string(),
                &event.disabled_by_email,
                &event.enabled_at.to_string(),
                &event.enabled_by_email,
                &event.project_id,
                &event.service_id,
            ],
            event.instance_count(),
        )?;
    }

    Ok(families([
        billable_duration,
        cost_amount,
        price_amount,
        cost_duration,
        scaling_history,
        activation_history,
    ]))
}
