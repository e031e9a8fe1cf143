//! Records returned by the management API
//!
//! Every struct tolerates missing fields so that a partially populated
//! payload still decodes, and every field reads an explicit `null` as its
//! default through [`nullable`].

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Treat an explicit JSON `null` the same as an absent field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload of `GET /health-check`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheck {
    #[serde(deserialize_with = "nullable")]
    pub status: String,
}

/// Payload of `GET /`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Info {
    #[serde(deserialize_with = "nullable")]
    pub version: String,
    #[serde(deserialize_with = "nullable")]
    pub domains: Domains,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Domains {
    #[serde(deserialize_with = "nullable")]
    pub infrastructure: String,
    #[serde(deserialize_with = "nullable")]
    pub service: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Provider {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub cloud_project_id: String,
}

/// A cluster reported by `GET /admin/cluster-discovery/discovered-clusters`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterDiscovery {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub provider: Provider,
    #[serde(deserialize_with = "nullable")]
    pub location: String,
    #[serde(deserialize_with = "nullable")]
    pub customer_backup_bucket: String,
    #[serde(deserialize_with = "nullable")]
    pub zones: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub plan_id: String,
    #[serde(rename = "isLXC", deserialize_with = "nullable")]
    pub is_lxc: bool,
    #[serde(deserialize_with = "nullable")]
    pub kubeconfig: Kubeconfig,
}

impl ClusterDiscovery {
    /// Lowercase `{cloudProjectId}_{name}`, the identifier projects use in
    /// their `cluster` field
    pub fn composite_name(&self) -> String {
        format!("{}_{}", self.provider.cloud_project_id, self.name).to_lowercase()
    }

    /// Base64 CA bundle, if the cluster carries one
    pub fn ca_data(&self) -> Option<&str> {
        let data = self.kubeconfig.cluster.ca_data.trim();
        (!data.is_empty()).then_some(data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kubeconfig {
    #[serde(deserialize_with = "nullable")]
    pub cluster: KubeconfigCluster,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KubeconfigCluster {
    #[serde(deserialize_with = "nullable")]
    pub ca_data: String,
}

/// Database sizing options; only populated for projects backed by a
/// managed database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectCloudOptions {
    #[serde(rename = "gcpDatabaseEdition", deserialize_with = "nullable")]
    pub database_edition: String,
    #[serde(rename = "gcpDatabaseVersion", deserialize_with = "nullable")]
    pub database_version: String,
    #[serde(rename = "gcpDiskSize", deserialize_with = "nullable")]
    pub disk_size: String,
    #[serde(rename = "gcpDiskType", deserialize_with = "nullable")]
    pub disk_type: String,
    #[serde(rename = "gcpInstanceType", deserialize_with = "nullable")]
    pub instance_type: String,
}

impl ProjectCloudOptions {
    pub fn is_empty(&self) -> bool {
        self.database_edition.is_empty()
            && self.database_version.is_empty()
            && self.disk_size.is_empty()
            && self.disk_type.is_empty()
            && self.instance_type.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Subscription {
    #[serde(deserialize_with = "nullable")]
    pub availability: String,
    #[serde(deserialize_with = "nullable")]
    pub env_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    #[serde(deserialize_with = "nullable")]
    pub commerce: bool,
    #[serde(rename = "documentLibraryStore", deserialize_with = "nullable")]
    pub doc_lib_store: String,
    #[serde(deserialize_with = "nullable")]
    pub trial: String,
    #[serde(deserialize_with = "nullable")]
    pub subscription: Subscription,
}

/// A project from `GET /admin/projects`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Project {
    #[serde(deserialize_with = "nullable")]
    pub cloud_options: ProjectCloudOptions,
    #[serde(deserialize_with = "nullable")]
    pub cluster: String,
    #[serde(deserialize_with = "nullable")]
    pub collaborators: Vec<serde_json::Value>,
    #[serde(deserialize_with = "nullable")]
    pub created_at: i64,
    #[serde(deserialize_with = "nullable")]
    pub health: String,
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub metadata: ProjectMetadata,
    #[serde(deserialize_with = "nullable")]
    pub organization_id: String,
    #[serde(deserialize_with = "nullable")]
    pub parent_project_id: String,
    #[serde(deserialize_with = "nullable")]
    pub project_id: String,
    #[serde(deserialize_with = "nullable")]
    pub status: String,
    #[serde(deserialize_with = "nullable")]
    pub volume_storage_size: i64,
}

impl Project {
    /// The declared parent identifier, or `None` for a root project.
    ///
    /// `organizationId` wins over `parentProjectId` when both are present.
    /// A parent equal to the project's own id means the project is its own
    /// root.
    pub fn parent_id(&self) -> Option<&str> {
        let parent = if self.organization_id.is_empty() {
            self.parent_project_id.as_str()
        } else {
            self.organization_id.as_str()
        };

        (!parent.is_empty() && parent != self.project_id).then_some(parent)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id().is_none()
    }

    pub fn is_running(&self) -> bool {
        self.status == "running"
    }

    pub fn is_healthy(&self) -> bool {
        self.health == "healthy"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoscaleCost {
    #[serde(deserialize_with = "nullable")]
    pub amount: f64,
    #[serde(deserialize_with = "nullable")]
    pub currency: String,
}

/// One window during which autoscaling was switched on for a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivationEvent {
    #[serde(deserialize_with = "nullable")]
    pub disabled_at: i64,
    #[serde(deserialize_with = "nullable")]
    pub disabled_by_email: String,
    #[serde(deserialize_with = "nullable")]
    pub enabled_at: i64,
    #[serde(deserialize_with = "nullable")]
    pub enabled_by_email: String,
    #[serde(deserialize_with = "nullable")]
    pub project_id: String,
    #[serde(deserialize_with = "nullable")]
    pub service_id: String,
    #[serde(deserialize_with = "nullable")]
    pub max_instances: i64,
}

impl ActivationEvent {
    /// Closed windows report their instance ceiling, open ones report zero
    pub fn instance_count(&self) -> f64 {
        if self.disabled_at != 0 {
            self.max_instances as f64
        } else {
            0.0
        }
    }
}

/// One scale-out episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScalingEvent {
    #[serde(deserialize_with = "nullable")]
    pub active_time_per_instance_ms: i64,
    #[serde(deserialize_with = "nullable")]
    pub ended_at: i64,
    #[serde(deserialize_with = "nullable")]
    pub num_additional_instances: i64,
    #[serde(deserialize_with = "nullable")]
    pub project_id: String,
    #[serde(deserialize_with = "nullable")]
    pub service_id: String,
    #[serde(deserialize_with = "nullable")]
    pub started_at: i64,
}

/// Per child project totals for the billing window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoscaleSubtotal {
    #[serde(deserialize_with = "nullable")]
    pub availability: String,
    #[serde(deserialize_with = "nullable")]
    pub billable_time_ms: i64,
    #[serde(deserialize_with = "nullable")]
    pub cost: AutoscaleCost,
    #[serde(deserialize_with = "nullable")]
    pub price: AutoscaleCost,
    #[serde(deserialize_with = "nullable")]
    pub total_active_time_ms: i64,
}

/// Autoscale statistics for one billing window, keyed by parent project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoscaleStat {
    #[serde(deserialize_with = "nullable")]
    pub activation_history: Vec<ActivationEvent>,
    #[serde(deserialize_with = "nullable")]
    pub included_child_project_ids: Vec<String>,
    #[serde(rename = "scaleHistory", deserialize_with = "nullable")]
    pub scaling_history: Vec<ScalingEvent>,
    #[serde(deserialize_with = "nullable")]
    pub subtotals_by_project_id: BTreeMap<String, AutoscaleSubtotal>,
}

impl AutoscaleStat {
    /// Included ids plus subtotal entries must be non-zero and even; an odd
    /// or empty sum means the upstream join went wrong.
    pub fn passes_parity(&self) -> bool {
        let total = self.included_child_project_ids.len() + self.subtotals_by_project_id.len();
        total != 0 && total % 2 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(project_id: &str, organization_id: &str) -> Project {
        Project {
            project_id: project_id.to_string(),
            organization_id: organization_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_project_root_when_ids_match() {
        let root = project("proj-1", "proj-1");
        assert!(root.is_root());
        assert_eq!(root.parent_id(), None);

        let child = project("proj-2", "proj-1");
        assert!(!child.is_root());
        assert_eq!(child.parent_id(), Some("proj-1"));
    }

    #[test]
    fn test_project_root_without_parent() {
        assert!(project("proj-1", "").is_root());

        let child = Project {
            project_id: "proj-2".to_string(),
            parent_project_id: "proj-1".to_string(),
            ..Default::default()
        };
        assert_eq!(child.parent_id(), Some("proj-1"));
    }

    #[test]
    fn test_project_decodes_api_payload() {
        let json = r#"{
            "id": "abc",
            "projectId": "proj-2",
            "organizationId": "proj-1",
            "createdAt": 1740926966862,
            "status": "running",
            "health": "healthy",
            "collaborators": null,
            "cluster": "project-123_cluster-1",
            "volumeStorageSize": 100,
            "cloudOptions": {"gcpDiskSize": "10", "gcpInstanceType": "db-custom-2"},
            "metadata": {
                "commerce": true,
                "documentLibraryStore": "gcs",
                "trial": "false",
                "subscription": {"availability": "HA", "envType": "prod"}
            }
        }"#;

        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.project_id, "proj-2");
        assert!(project.collaborators.is_empty());
        assert!(project.is_running());
        assert!(project.is_healthy());
        assert_eq!(project.cloud_options.disk_size, "10");
        assert!(!project.cloud_options.is_empty());
        assert_eq!(project.metadata.subscription.env_type, "prod");
        assert_eq!(project.metadata.doc_lib_store, "gcs");
    }

    #[test]
    fn test_activation_instance_count() {
        let open = ActivationEvent {
            disabled_at: 0,
            max_instances: 3,
            ..Default::default()
        };
        assert_eq!(open.instance_count(), 0.0);

        let closed = ActivationEvent {
            disabled_at: 1740926969477,
            max_instances: 3,
            ..Default::default()
        };
        assert_eq!(closed.instance_count(), 3.0);
    }

    #[test]
    fn test_null_scalars_read_as_defaults() {
        let stat: AutoscaleStat = serde_json::from_str(
            r#"{
                "activationHistory": [{
                    "projectId": "proj-1",
                    "serviceId": null,
                    "enabledAt": 1740926966862,
                    "enabledByEmail": null,
                    "maxInstances": null,
                    "disabledAt": null,
                    "disabledByEmail": null
                }],
                "includedChildProjectIds": ["proj-1"],
                "subtotalsByProjectId": {
                    "proj-1": {
                        "billableTimeMs": null,
                        "totalActiveTimeMs": null,
                        "cost": {"amount": null, "currency": null},
                        "price": null
                    }
                }
            }"#,
        )
        .unwrap();

        let event = &stat.activation_history[0];
        assert_eq!(event.disabled_at, 0);
        assert_eq!(event.max_instances, 0);
        assert_eq!(event.instance_count(), 0.0);

        let subtotal = &stat.subtotals_by_project_id["proj-1"];
        assert_eq!(subtotal.billable_time_ms, 0);
        assert_eq!(subtotal.cost.amount, 0.0);
        assert_eq!(subtotal.price, AutoscaleCost::default());

        let project: Project = serde_json::from_str(
            r#"{"id": null, "projectId": "proj-1", "createdAt": null,
                "volumeStorageSize": null, "metadata": {"commerce": null}}"#,
        )
        .unwrap();
        assert_eq!(project.project_id, "proj-1");
        assert_eq!(project.created_at, 0);
        assert_eq!(project.volume_storage_size, 0);
        assert!(!project.metadata.commerce);
    }

    #[test]
    fn test_autoscale_parity() {
        let mut stat = AutoscaleStat::default();
        assert!(!stat.passes_parity());

        stat.included_child_project_ids = vec!["proj-1".to_string()];
        stat.subtotals_by_project_id
            .insert("proj-1".to_string(), AutoscaleSubtotal::default());
        assert!(stat.passes_parity());

        stat.subtotals_by_project_id
            .insert("proj-2".to_string(), AutoscaleSubtotal::default());
        assert!(!stat.passes_parity());
    }

    #[test]
    fn test_cluster_composite_name() {
        let cluster = ClusterDiscovery {
            name: "Cluster-1".to_string(),
            provider: Provider {
                name: "gcp".to_string(),
                cloud_project_id: "Project-123".to_string(),
            },
            ..Default::default()
        };
        assert_eq!(cluster.composite_name(), "project-123_cluster-1");
        assert_eq!(cluster.ca_data(), None);
    }

    #[test]
    fn test_cluster_decodes_lxc_flag() {
        let cluster: ClusterDiscovery =
            serde_json::from_str(r#"{"name": "c", "isLXC": true, "zones": null}"#).unwrap();
        assert!(cluster.is_lxc);
        assert!(cluster.zones.is_empty());
    }
}
