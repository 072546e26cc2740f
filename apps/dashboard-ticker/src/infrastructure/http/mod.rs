//! HTTP Server
//!
//! One axum listener serves the management API, the viewer WebSocket,
//! health probes and Prometheus metrics.
//!
//! # Endpoints
//!
//! - `GET /health`, `GET /healthz`, `GET /readyz`, `GET /metrics`
//! - `GET|POST /api/dashboards`, `GET|PUT|DELETE /api/dashboards/{id}`
//! - `GET|POST /api/feeds`, `PUT|DELETE /api/feeds/{id}`
//! - `GET|POST /api/content`, `PUT|DELETE /api/content/{id}`
//! - `GET|POST /api/config`
//! - `GET /api/ticker`
//! - `GET /ws`

mod api;
mod error;
mod health;
mod state;
mod ws;

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, put};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use api::DashboardQuery;
pub use error::{ApiError, ApiResult};
pub use health::{HealthResponse, SchedulerStatus, ViewerStatus};
pub use state::{AppState, SharedState};
pub use ws::ClientMessage;

/// Build the complete router.
pub fn router(state: SharedState) -> Router {
    let api = Router::new()
        .route(
            "/dashboards",
            get(api::list_dashboards).post(api::create_dashboard),
        )
        .route(
            "/dashboards/{id}",
            get(api::get_dashboard)
                .put(api::update_dashboard)
                .delete(api::delete_dashboard),
        )
        .route("/feeds", get(api::list_feeds).post(api::create_feed))
        .route(
            "/feeds/{id}",
            put(api::update_feed).delete(api::delete_feed),
        )
        .route("/content", get(api::list_content).post(api::create_content))
        .route(
            "/content/{id}",
            put(api::update_content).delete(api::delete_content),
        )
        .route("/config", get(api::get_config).post(api::update_config))
        .route("/ticker", get(api::get_ticker));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/healthz", get(health::liveness_handler))
        .route("/readyz", get(health::readiness_handler))
        .route("/metrics", get(health::metrics_handler))
        .route("/ws", get(ws::ws_handler))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Server
// =============================================================================

/// HTTP server bound to all interfaces.
pub struct HttpServer {
    port: u16,
    state: SharedState,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(port: u16, state: SharedState, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}
