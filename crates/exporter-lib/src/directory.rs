//! Cached project list shared between collectors
//!
//! The directory keeps the last successful `/admin/projects` result. A
//! failed refresh leaves the previous snapshot in place, so readers may see
//! stale data but never lose it.

use crate::client::{paths, ApiClient};
use crate::error::Result;
use crate::models::Project;
use crate::observability::ExporterMetrics;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ProjectDirectory {
    client: ApiClient,
    projects: Arc<RwLock<Arc<[Project]>>>,
    metrics: ExporterMetrics,
}

impl ProjectDirectory {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            projects: Arc::new(RwLock::new(Arc::from(Vec::new()))),
            metrics: ExporterMetrics::new(),
        }
    }

    /// Last cached snapshot
    pub async fn projects(&self) -> Arc<[Project]> {
        self.projects.read().await.clone()
    }

    /// Overwrite the snapshot; previous contents are discarded, not merged
    pub async fn replace(&self, projects: Vec<Project>) {
        let count = projects.len();
        *self.projects.write().await = Arc::from(projects);
        self.metrics.set_cached_projects(count as i64);
    }

    /// Fetch the project list and swap it in.
    ///
    /// On failure the cached snapshot is left untouched.
    pub async fn refresh(&self) -> Result<usize> {
        match self.client.fetch::<Project>(paths::PROJECTS, &[]).await {
            Ok(projects) => {
                let count = projects.len();
                self.replace(projects).await;
                info!(
                    event = "project_directory_refreshed",
                    projects = count,
                    "Project directory refreshed"
                );
                Ok(count)
            }
            Err(e) => {
                warn!(
                    component = "project_directory",
                    error = %e,
                    "Failed to refresh projects, keeping cached snapshot"
                );
                Err(e)
            }
        }
    }
}

/// Identifiers of root projects, in source order
pub fn root_project_ids(projects: &[Project]) -> Vec<String> {
    projects
        .iter()
        .filter(|p| p.is_root())
        .map(|p| p.project_id.clone())
        .collect()
}
