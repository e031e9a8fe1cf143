//! Per-project gauges from `/admin/projects`

use super::gauge::{describe_all, families, GaugeFamily, GaugeSpec};
use super::{async_trait, MetricsCollector};
use crate::client::{paths, ApiClient};
use crate::convert::{bool_label, gb_to_bytes, gib_to_bytes, millis_to_seconds, parse_i64_or_zero};
use crate::directory::ProjectDirectory;
use crate::error::Result;
use crate::health::components;
use crate::models::Project;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use tracing::debug;

const SUBSYSTEM: &str = "projects";

const TOTAL: GaugeSpec = GaugeSpec::new(SUBSYSTEM, "total", "Total number of projects", &[]);

const STATUS: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "status",
    "1 if the project is running, 0 otherwise",
    &["project_name"],
);

const LABELS: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "labels",
    "Project metadata carried as labels, always 1",
    &[
        "availability",
        "cluster",
        "commerce",
        "doc_lib_store",
        "health",
        "id",
        "name",
        "parent_project_name",
        "root_project",
        "trial",
        "type",
    ],
);

const CREATE_TIMESTAMP: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "create_timestamp",
    "Project creation time in seconds since the Unix epoch",
    &["project_name"],
);

const COLLABORATORS: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "collaborators",
    "Number of collaborators on the project",
    &["project_name"],
);

const VOLUME_STORAGE_CAPACITY: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "volume_storage_capacity_bytes",
    "Provisioned volume storage in bytes",
    &["project_name"],
);

const DB_LABELS: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "db_labels",
    "Managed database options carried as labels, always 1",
    &["disk_type", "edition", "instance_type", "project_name", "version"],
);

const DB_STORAGE_CAPACITY: GaugeSpec = GaugeSpec::new(
    SUBSYSTEM,
    "db_storage_capacity_bytes",
    "Provisioned managed database disk in bytes",
    &["project_name"],
);

const SPECS: &[GaugeSpec] = &[
    TOTAL,
    STATUS,
    LABELS,
    CREATE_TIMESTAMP,
    COLLABORATORS,
    VOLUME_STORAGE_CAPACITY,
    DB_LABELS,
    DB_STORAGE_CAPACITY,
];

/// Emits project counts, status and metadata, and feeds every successful
/// fetch into the [`ProjectDirectory`]
pub struct ProjectsCollector {
    client: ApiClient,
    directory: ProjectDirectory,
}

impl ProjectsCollector {
    pub fn new(client: ApiClient, directory: ProjectDirectory) -> Self {
        Self { client, directory }
    }
}

#[async_trait]
impl MetricsCollector for ProjectsCollector {
    fn name(&self) -> &'static str {
        components::PROJECTS
    }

    fn describe(&self) -> Result<Vec<Desc>> {
        describe_all(SPECS)
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>> {
        let projects: Vec<Project> = self.client.fetch(paths::PROJECTS, &[]).await?;
        debug!(component = SUBSYSTEM, projects = projects.len(), "Fetched projects");

        let output = project_families(&projects)?;
        self.directory.replace(projects).await;
        Ok(output)
    }
}

struct ProjectGauges {
    total: GaugeFamily,
    status: GaugeFamily,
    labels: GaugeFamily,
    create_timestamp: GaugeFamily,
    collaborators: GaugeFamily,
    volume_storage_capacity: GaugeFamily,
    db_labels: GaugeFamily,
    db_storage_capacity: GaugeFamily,
}

impl ProjectGauges {
    fn new() -> Self {
        Self {
            total: TOTAL.family(),
            status: STATUS.family(),
            labels: LABELS.family(),
            create_timestamp: CREATE_TIMESTAMP.family(),
            collaborators: COLLABORATORS.family(),
            volume_storage_capacity: VOLUME_STORAGE_CAPACITY.family(),
            db_labels: DB_LABELS.family(),
            db_storage_capacity: DB_STORAGE_CAPACITY.family(),
        }
    }

    fn observe(&mut self, project: &Project) -> Result<()> {
        let name = project.project_id.as_str();
        let metadata = &project.metadata;

        self.status
            .observe(&[name], if project.is_running() { 1.0 } else { 0.0 })?;

        self.labels.observe(
            &[
                &metadata.subscription.availability,
                &project.cluster,
                bool_label(metadata.commerce),
                &metadata.doc_lib_store,
                bool_label(project.is_healthy()),
                &project.id,
                name,
                project.parent_id().unwrap_or(""),
                bool_label(project.is_root()),
                &metadata.trial,
                &metadata.subscription.env_type,
            ],
            1.0,
        )?;

        self.create_timestamp
            .observe(&[name], millis_to_seconds(project.created_at))?;
        self.collaborators
            .observe(&[name], project.collaborators.len() as f64)?;
        self.volume_storage_capacity
            .observe(&[name], gib_to_bytes(project.volume_storage_size) as f64)?;

        let options = &project.cloud_options;
        if options.is_empty() || project.is_root() {
            return Ok(());
        }

        self.db_labels.observe(
            &[
                &options.disk_type,
                &options.database_edition,
                &options.instance_type,
                name,
                &options.database_version,
            ],
            1.0,
        )?;

        if !options.disk_size.is_empty() {
            self.db_storage_capacity.observe(
                &[name],
                gb_to_bytes(parse_i64_or_zero(&options.disk_size)) as f64,
            )?;
        }
        Ok(())
    }

    fn finish(self) -> Vec<MetricFamily> {
        families([
            self.total,
            self.status,
            self.labels,
            self.create_timestamp,
            self.collaborators,
            self.volume_storage_capacity,
            self.db_labels,
            self.db_storage_capacity,
        ])
    }
}

/// Derive every project family from one fetched list, in list order
pub(crate) fn project_families(projects: &[Project]) -> Result<Vec<MetricFamily>> {
    let mut gauges = ProjectGauges::new();
    gauges.total.observe(&[], projects.len() as f64)?;

    for project in projects {
        gauges.observe(project)?;
    }

    Ok(gauges.finish())
}
