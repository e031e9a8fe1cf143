//! Exporter configuration
//!
//! Values are layered: built-in defaults, then an optional config file, then
//! `LCP_EXPORTER_*` environment variables, then explicit command line flags.
//! The API token is only ever read from `LCP_API_TOKEN`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

pub const TOKEN_ENV: &str = "LCP_API_TOKEN";
pub const ENV_PREFIX: &str = "LCP_EXPORTER";

/// Paths served by the exporter itself
const RESERVED_PATHS: &[&str] = &["/", "/healthz", "/readyz"];

/// Command line flags
#[derive(Debug, Default, Parser)]
#[command(
    name = "lcp-exporter",
    version,
    about = "Prometheus exporter for the LCP management API"
)]
pub struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the management API
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Autoscale reporting lookback, e.g. `24h` or `30days`
    #[arg(long)]
    pub duration: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Path under which metrics are exposed
    #[arg(long)]
    pub metrics_path: Option<String>,

    /// One of trace, debug, info, warn, error
    #[arg(long)]
    pub log_level: Option<String>,

    /// Either json or text
    #[arg(long)]
    pub log_format: Option<String>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub enable_projects_metrics: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub enable_autoscale_metrics: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub enable_cluster_discovery_metrics: Option<bool>,

    /// Include the exporter's own collector metrics in every scrape
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub enable_exporter_metrics: Option<bool>,

    /// How often the cached project list is refreshed, e.g. `60s`
    #[arg(long)]
    pub project_refresh_interval: Option<String>,
}

/// Raw layered settings, before validation
#[derive(Debug, Deserialize)]
struct Settings {
    endpoint: String,
    duration: String,
    port: u16,
    metrics_path: String,
    log_level: String,
    log_format: String,
    enable_projects_metrics: bool,
    enable_autoscale_metrics: bool,
    enable_cluster_discovery_metrics: bool,
    enable_exporter_metrics: bool,
    project_refresh_interval: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => bail!("unknown log format {other:?}, expected json or text"),
        }
    }
}

/// Which optional collectors are registered; info and up always are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorToggles {
    pub projects: bool,
    pub autoscale: bool,
    pub cluster_discovery: bool,
}

/// Fully resolved exporter configuration
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub endpoint: String,
    pub token: String,
    pub lookback: Duration,
    pub port: u16,
    pub metrics_path: String,
    pub log_level: Level,
    pub log_format: LogFormat,
    pub collectors: CollectorToggles,
    pub exporter_metrics: bool,
    pub project_refresh_interval: Duration,
}

impl ExporterConfig {
    /// Load configuration from flags, file and environment
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::resolve(cli, std::env::var(TOKEN_ENV).ok())
    }

    /// Resolve and validate configuration with an explicit token
    pub fn resolve(cli: &Cli, token: Option<String>) -> Result<Self> {
        let settings: Settings = layered(cli)?
            .try_deserialize()
            .context("Invalid configuration")?;

        let token = token.map(|t| t.trim().to_string()).unwrap_or_default();
        if token.is_empty() {
            bail!("{TOKEN_ENV} must be set to a management API token");
        }

        let endpoint = settings.endpoint.trim().to_string();
        if endpoint.is_empty() {
            bail!("an API endpoint is required (--endpoint or {ENV_PREFIX}_ENDPOINT)");
        }

        let lookback = humantime::parse_duration(settings.duration.trim()).with_context(|| {
            format!(
                "invalid duration {:?}, expected a non-negative span such as 24h",
                settings.duration
            )
        })?;

        let project_refresh_interval =
            humantime::parse_duration(settings.project_refresh_interval.trim()).with_context(
                || {
                    format!(
                        "invalid project refresh interval {:?}",
                        settings.project_refresh_interval
                    )
                },
            )?;
        if project_refresh_interval.is_zero() {
            bail!("project refresh interval must be greater than zero");
        }

        let log_level = settings
            .log_level
            .parse::<Level>()
            .map_err(|_| anyhow::anyhow!("invalid log level {:?}", settings.log_level))?;
        let log_format = settings.log_format.parse::<LogFormat>()?;

        let metrics_path = settings.metrics_path;
        if !metrics_path.starts_with('/') || RESERVED_PATHS.contains(&metrics_path.as_str()) {
            bail!("invalid metrics path {metrics_path:?}");
        }

        Ok(Self {
            endpoint,
            token,
            lookback,
            port: settings.port,
            metrics_path,
            log_level,
            log_format,
            collectors: CollectorToggles {
                projects: settings.enable_projects_metrics,
                autoscale: settings.enable_autoscale_metrics,
                cluster_discovery: settings.enable_cluster_discovery_metrics,
            },
            exporter_metrics: settings.enable_exporter_metrics,
            project_refresh_interval,
        })
    }
}

fn layered(cli: &Cli) -> Result<config::Config> {
    let mut builder = config::Config::builder()
        .set_default("endpoint", "")?
        .set_default("duration", "0s")?
        .set_default("port", 9103_i64)?
        .set_default("metrics_path", "/metrics")?
        .set_default("log_level", "info")?
        .set_default("log_format", "json")?
        .set_default("enable_projects_metrics", true)?
        .set_default("enable_autoscale_metrics", true)?
        .set_default("enable_cluster_discovery_metrics", true)?
        .set_default("enable_exporter_metrics", false)?
        .set_default("project_refresh_interval", "60s")?;

    if let Some(path) = &cli.config {
        builder = builder.add_source(config::File::from(path.as_path()));
    }

    let config = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .set_override_option("endpoint", cli.endpoint.clone())?
        .set_override_option("duration", cli.duration.clone())?
        .set_override_option("port", cli.port.map(i64::from))?
        .set_override_option("metrics_path", cli.metrics_path.clone())?
        .set_override_option("log_level", cli.log_level.clone())?
        .set_override_option("log_format", cli.log_format.clone())?
        .set_override_option("enable_projects_metrics", cli.enable_projects_metrics)?
        .set_override_option("enable_autoscale_metrics", cli.enable_autoscale_metrics)?
        .set_override_option(
            "enable_cluster_discovery_metrics",
            cli.enable_cluster_discovery_metrics,
        )?
        .set_override_option("enable_exporter_metrics", cli.enable_exporter_metrics)?
        .set_override_option(
            "project_refresh_interval",
            cli.project_refresh_interval.clone(),
        )?
        .build()
        .context("Failed to load configuration")?;

    Ok(config)
}
