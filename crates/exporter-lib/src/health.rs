//! Health tracking for the exporter's upstream dependencies
//!
//! Each collector and the project directory report the outcome of their
//! last round trip here. `/healthz` and `/readyz` render the result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of a component's last round trip, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Failed, but previously fetched data is still served
    Degraded,
    /// Nothing usable is available
    Unhealthy,
}

impl ComponentStatus {
    /// Whether the exporter can still answer scrapes in this state
    pub fn is_serving(self) -> bool {
        self != ComponentStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unix seconds of the report
    pub checked_at: i64,
}

impl ComponentHealth {
    pub fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthReport {
    /// The overall status is the worst one reported
    pub fn from_components(components: BTreeMap<String, ComponentHealth>) -> Self {
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        Self { status, components }
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Readiness {
    fn not_ready(reason: &str) -> Self {
        Self {
            ready: false,
            reason: Some(reason.to_string()),
        }
    }
}

pub mod components {
    pub const PROJECT_DIRECTORY: &str = "project_directory";
    pub const PROJECTS: &str = "projects";
    pub const AUTOSCALE: &str = "autoscale";
    pub const CLUSTER_DISCOVERY: &str = "cluster_discovery";
    pub const INFO: &str = "info";
    pub const UP: &str = "up";
}

#[derive(Debug, Default)]
struct State {
    components: BTreeMap<String, ComponentHealth>,
    directory_loaded: bool,
}

/// Shared per-component status plus the startup readiness flag
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<State>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a component, starting out healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Flipped once the first directory refresh has been attempted
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.directory_loaded = ready;
    }

    pub async fn report(&self) -> HealthReport {
        HealthReport::from_components(self.state.read().await.components.clone())
    }

    pub async fn readiness(&self) -> Readiness {
        let state = self.state.read().await;
        if !state.directory_loaded {
            return Readiness::not_ready("Project directory not yet loaded");
        }

        let unhealthy = state
            .components
            .iter()
            .find(|(_, c)| !c.status.is_serving());
        match unhealthy {
            Some((name, _)) => Readiness::not_ready(&format!("Component {name} is unhealthy")),
            None => Readiness {
                ready: true,
                reason: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let report = HealthRegistry::new().report().await;

        assert_eq!(report.status, ComponentStatus::Healthy);
        assert!(report.components.is_empty());
    }

    #[tokio::test]
    async fn test_collector_failure_degrades() {
        let registry = HealthRegistry::new();
        registry.register(components::PROJECTS).await;
        registry.register(components::UP).await;

        registry
            .set_degraded(components::PROJECTS, "status 503: unavailable")
            .await;

        let report = registry.report().await;
        assert_eq!(report.status, ComponentStatus::Degraded);
        assert_eq!(
            report.components[components::PROJECTS].message.as_deref(),
            Some("status 503: unavailable")
        );
        assert_eq!(report.components[components::UP].status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_unhealthy_wins() {
        let registry = HealthRegistry::new();
        registry.register(components::PROJECTS).await;
        registry.set_degraded(components::PROJECTS, "slow").await;
        registry
            .set_unhealthy(components::PROJECT_DIRECTORY, "never loaded")
            .await;

        assert_eq!(registry.report().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness_needs_directory_and_no_unhealthy_component() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Project directory not yet loaded"));

        registry.set_ready(true).await;
        registry.set_degraded(components::INFO, "timeout").await;
        assert!(registry.readiness().await.ready);

        registry
            .set_unhealthy(components::PROJECT_DIRECTORY, "never loaded")
            .await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Component project_directory is unhealthy")
        );
    }
}
