//! Health and metrics endpoints.
//!
//! - `GET /health` - JSON status with viewer and scheduler details
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (scheduler running)
//! - `GET /metrics` - Prometheus metrics in text format

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::{AppState, SharedState};
use crate::infrastructure::metrics::get_metrics_handle;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: &'static str,
    /// Current time.
    pub timestamp: DateTime<Utc>,
    /// Service version.
    pub version: String,
    /// Process uptime in seconds.
    pub uptime_secs: u64,
    /// Connected viewers.
    pub viewers: ViewerStatus,
    /// Refresh scheduler state.
    pub scheduler: SchedulerStatus,
}

/// Connected viewer counts.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerStatus {
    /// Open connections.
    pub connections: usize,
    /// Dashboards with at least one viewer.
    pub dashboards: usize,
    /// Total (connection, dashboard) memberships.
    pub subscriptions: usize,
}

/// Refresh scheduler state.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    /// Whether the recurring refresh is installed.
    pub running: bool,
    /// Current period in milliseconds.
    pub period_ms: Option<u64>,
}

pub(super) async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(build_health_response(&state))
}

pub(super) async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub(super) async fn readiness_handler(State(state): State<SharedState>) -> impl IntoResponse {
    if state.service.scheduler().is_running() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

pub(super) async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let stats = state.gateway.stats();
    let scheduler = state.service.scheduler();

    HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        viewers: ViewerStatus {
            connections: stats.connections,
            dashboards: stats.subscriptions.dashboard_count,
            subscriptions: stats.subscriptions.membership_count,
        },
        scheduler: SchedulerStatus {
            running: scheduler.is_running(),
            period_ms: scheduler
                .period()
                .map(|p| u64::try_from(p.as_millis()).unwrap_or(u64::MAX)),
        },
    }
}
