//! Management API access
//!
//! [`ApiClient`] performs the HTTP round trip; [`normalize`] turns the body
//! into records regardless of how the API chose to wrap it.

mod fetcher;
mod normalize;

pub use fetcher::{ApiClient, ClientConfig, DEFAULT_TIMEOUT};
pub use normalize::{normalize, Decoded, STATUS_OK};

/// Paths on the management API
pub mod paths {
    pub const PROJECTS: &str = "/admin/projects";
    pub const AUTOSCALE_STATS: &str = "/admin/reports/autoscale/stats";
    pub const DISCOVERED_CLUSTERS: &str = "/admin/cluster-discovery/discovered-clusters";
    pub const HEALTH_CHECK: &str = "/health-check";
    pub const ROOT: &str = "/";
}
