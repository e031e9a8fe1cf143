//! Exporter library for the LCP management API
//!
//! This crate provides the core functionality for:
//! - Fetching and normalizing management API responses
//! - Caching the project list for dependent collectors
//! - Deriving gauge families from projects, autoscale stats and clusters
//! - Health checks and observability

pub mod certificate;
pub mod client;
pub mod collector;
pub mod convert;
pub mod directory;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod window;

pub use client::{ApiClient, ClientConfig};
pub use collector::{
    AutoscaleCollector, ClusterDiscoveryCollector, CollectorRegistry, InfoCollector,
    MetricsCollector, ProjectsCollector, UpCollector,
};
pub use directory::{root_project_ids, ProjectDirectory};
pub use error::{ExporterError, Result};
pub use health::{
    components, ComponentHealth, ComponentStatus, HealthRegistry, HealthReport, Readiness,
};
pub use observability::{ExporterMetrics, StructuredLogger};
pub use window::DateWindow;
