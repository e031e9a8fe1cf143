//! HTTP API for the landing page, health checks and scraped metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use exporter_lib::{health::HealthRegistry, CollectorRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub collectors: Arc<CollectorRegistry>,
    pub metrics_path: String,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        collectors: Arc<CollectorRegistry>,
        metrics_path: impl Into<String>,
    ) -> Self {
        Self {
            health_registry,
            collectors,
            metrics_path: metrics_path.into(),
        }
    }
}

async fn landing(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>LCP Exporter</title></head>
<body>
<h1>LCP Exporter</h1>
<p>Version {version}</p>
<ul>
<li><a href="{metrics}">Metrics</a></li>
<li><a href="/healthz">Health</a></li>
</ul>
</body>
</html>
"#,
        version = env!("CARGO_PKG_VERSION"),
        metrics = state.metrics_path,
    ))
}

/// JSON body with 200 when `ok`, 503 otherwise
fn json_status<T: Serialize>(ok: bool, body: T) -> Response {
    let code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body)).into_response()
}

/// Degraded still answers 200; only an unhealthy component fails the check
async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    let report = state.health_registry.report().await;
    json_status(report.status.is_serving(), report)
}

async fn readyz(State(state): State<Arc<AppState>>) -> Response {
    let readiness = state.health_registry.readiness().await;
    json_status(readiness.ready, readiness)
}

/// Runs every collector and encodes the result
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.collectors.render().await {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let metrics_path = state.metrics_path.clone();

    Router::new()
        .route("/", get(landing))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(&metrics_path, get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
