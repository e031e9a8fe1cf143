//! LCP Exporter - Prometheus exporter for the LCP management API
//!
//! Polls the management API on every scrape and republishes selected fields
//! as gauges. The project list is cached and refreshed in the background.

use anyhow::{Context, Result};
use clap::Parser;
use exporter_lib::{
    health::{components, ComponentHealth, HealthRegistry},
    observability::StructuredLogger,
    ApiClient, AutoscaleCollector, ClientConfig, ClusterDiscoveryCollector, CollectorRegistry,
    DateWindow, InfoCollector, MetricsCollector, ProjectDirectory, ProjectsCollector,
    UpCollector,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

mod api;
mod config;

use config::{Cli, ExporterConfig, LogFormat};

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ExporterConfig::load(&cli)?;

    init_tracing(&config);
    info!("Starting lcp-exporter");

    let client = ApiClient::new(ClientConfig::new(&config.endpoint, &config.token))
        .context("Failed to create management API client")?;
    info!(endpoint = %client.endpoint(), "Exporter configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::PROJECT_DIRECTORY).await;

    let logger = StructuredLogger::new(client.endpoint());
    let directory = ProjectDirectory::new(client.clone());

    // Readiness flips after the first attempt, whatever its outcome
    refresh_directory(&directory, &health_registry).await;
    health_registry.set_ready(true).await;

    let collectors = build_collectors(&config, &client, &directory, &health_registry, &logger)
        .await
        .context("Failed to register collectors")?;

    let refresher = tokio::spawn(run_refresher(
        directory,
        health_registry.clone(),
        config.project_refresh_interval,
    ));

    let listen = format!("0.0.0.0:{}", config.port);
    logger.log_startup(EXPORTER_VERSION, &listen, &config.metrics_path);

    let app_state = Arc::new(api::AppState::new(
        health_registry,
        Arc::new(collectors),
        &config.metrics_path,
    ));

    let result = tokio::select! {
        served = api::serve(config.port, app_state) => served.context("API server failed"),
        signal = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
            signal.context("Failed to listen for shutdown signal")
        }
    };

    refresher.abort();
    info!("Shutting down");

    result
}

fn init_tracing(config: &ExporterConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.log_level).into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

async fn build_collectors(
    config: &ExporterConfig,
    client: &ApiClient,
    directory: &ProjectDirectory,
    health_registry: &HealthRegistry,
    logger: &StructuredLogger,
) -> Result<CollectorRegistry> {
    let toggles = config.collectors;
    let mut registry = CollectorRegistry::new(health_registry.clone(), logger.clone())
        .with_self_metrics(config.exporter_metrics);

    add_collector(
        &mut registry,
        logger,
        toggles.projects,
        Arc::new(ProjectsCollector::new(client.clone(), directory.clone())),
    )
    .await?;
    add_collector(
        &mut registry,
        logger,
        toggles.autoscale,
        Arc::new(AutoscaleCollector::new(
            client.clone(),
            directory.clone(),
            DateWindow::new(config.lookback),
        )),
    )
    .await?;
    add_collector(
        &mut registry,
        logger,
        toggles.cluster_discovery,
        Arc::new(ClusterDiscoveryCollector::new(client.clone())),
    )
    .await?;
    add_collector(
        &mut registry,
        logger,
        true,
        Arc::new(InfoCollector::new(client.clone())),
    )
    .await?;
    add_collector(
        &mut registry,
        logger,
        true,
        Arc::new(UpCollector::new(client.clone())),
    )
    .await?;

    Ok(registry)
}

async fn add_collector(
    registry: &mut CollectorRegistry,
    logger: &StructuredLogger,
    enabled: bool,
    collector: Arc<dyn MetricsCollector>,
) -> Result<()> {
    logger.log_collector_registered(collector.name(), enabled);
    if enabled {
        registry.register(collector).await?;
    }
    Ok(())
}

/// Refresh the cached project list and record the outcome.
///
/// A failure with a stale snapshot still cached is degraded; a failure with
/// nothing cached is unhealthy.
async fn refresh_directory(directory: &ProjectDirectory, health_registry: &HealthRegistry) {
    let status = match directory.refresh().await {
        Ok(_) => ComponentHealth::healthy(),
        Err(e) => {
            if directory.projects().await.is_empty() {
                ComponentHealth::unhealthy(e.to_string())
            } else {
                ComponentHealth::degraded(format!("Serving stale projects: {e}"))
            }
        }
    };

    health_registry
        .update(components::PROJECT_DIRECTORY, status)
        .await;
}

async fn run_refresher(
    directory: ProjectDirectory,
    health_registry: HealthRegistry,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately and startup already refreshed
    ticker.tick().await;

    loop {
        ticker.tick().await;
        refresh_directory(&directory, &health_registry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exporter_lib::{client::paths, health::ComponentStatus, models::Project};

    async fn setup(status: usize, body: &str) -> (mockito::ServerGuard, ProjectDirectory) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", paths::PROJECTS)
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;

        let client = ApiClient::new(ClientConfig::new(server.url(), "token")).unwrap();
        (server, ProjectDirectory::new(client))
    }

    async fn directory_status(health_registry: &HealthRegistry) -> ComponentStatus {
        health_registry.report().await.components[components::PROJECT_DIRECTORY].status
    }

    #[tokio::test]
    async fn test_refresh_success_is_healthy() {
        let (_server, directory) = setup(200, r#"[{"projectId": "proj-1"}]"#).await;
        let health_registry = HealthRegistry::new();

        refresh_directory(&directory, &health_registry).await;

        assert_eq!(directory_status(&health_registry).await, ComponentStatus::Healthy);
        assert_eq!(directory.projects().await.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_without_cache_is_unhealthy() {
        let (_server, directory) = setup(500, "boom").await;
        let health_registry = HealthRegistry::new();

        refresh_directory(&directory, &health_registry).await;

        assert_eq!(directory_status(&health_registry).await, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_refresh_failure_with_stale_cache_is_degraded() {
        let (_server, directory) = setup(503, "maintenance").await;
        directory
            .replace(vec![Project {
                project_id: "proj-1".to_string(),
                ..Default::default()
            }])
            .await;
        let health_registry = HealthRegistry::new();

        refresh_directory(&directory, &health_registry).await;

        assert_eq!(directory_status(&health_registry).await, ComponentStatus::Degraded);
        assert_eq!(directory.projects().await[0].project_id, "proj-1");
    }
}
