//! HTTP surface: on-demand analysis endpoint plus the scheduled scanner.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::pipeline::RcaPipeline;
use crate::prometheus::PrometheusClient;
use crate::scanner::WorkloadScanner;

/// Delay before the first scheduled scan after startup.
const SCAN_STARTUP_DELAY_SECS: u64 = 10;

/// Shared state behind the HTTP handlers.
pub struct AppState {
    /// The analysis pipeline
    pub pipeline: Arc<RcaPipeline>,
    /// Prometheus client, probed by the status endpoint
    pub prometheus: Arc<PrometheusClient>,
}

/// Build the service router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rca/analyze", get(analyze_handler))
        .route("/rca/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    #[serde(default = "default_namespace")]
    namespace: String,
    #[serde(default)]
    pod: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Error body for failed requests.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// On-demand analysis: `GET /rca/analyze?namespace=<ns>&pod=<name>`.
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyzeParams>,
) -> Response {
    if params.pod.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Pod name is required".to_string(),
            }),
        )
            .into_response();
    }

    match state
        .pipeline
        .run_analysis(&params.namespace, &params.pod)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            error!(
                namespace = %params.namespace,
                pod = %params.pod,
                error = %e,
                "Analysis request failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Service status response.
#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    prometheus_healthy: bool,
}

/// Service status: reports backing metric store health.
async fn status_handler(State(state): State<Arc<AppState>>) -> Response {
    let prometheus_healthy = state.prometheus.health_check().await;
    let status = if prometheus_healthy { "healthy" } else { "degraded" };
    Json(StatusResponse {
        status,
        prometheus_healthy,
    })
    .into_response()
}

/// Run the HTTP server and the delayed interval scan loop until shutdown.
pub async fn serve(
    state: Arc<AppState>,
    scanner: Arc<WorkloadScanner>,
    bind: &str,
    scan_interval_secs: u64,
) -> Result<()> {
    tokio::spawn(run_scan_loop(scanner, scan_interval_secs));

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(addr = %bind, "RCA server listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn run_scan_loop(scanner: Arc<WorkloadScanner>, interval_secs: u64) {
    tokio::time::sleep(Duration::from_secs(SCAN_STARTUP_DELAY_SECS)).await;
    info!(interval_secs, "Scheduled scanner initialized");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        debug!("Scheduled workload scan triggered");
        match scanner.scan().await {
            Ok(summary) => info!(
                found = summary.pods_found,
                analyzed = summary.analyzed,
                failed = summary.failed,
                "Workload scan complete"
            ),
            Err(e) => error!(error = %e, "Workload scan failed"),
        }
    }
}
