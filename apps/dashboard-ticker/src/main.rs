//! Dashboard Ticker Binary
//!
//! Starts the ticker engine and its HTTP/WebSocket server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin dashboard-ticker
//! ```
//!
//! # Environment Variables
//!
//! - `TICKER_HTTP_PORT`: REST, WebSocket, health and metrics port (default: 3000)
//! - `TICKER_FETCH_TIMEOUT_MS`: Per-feed fetch timeout (default: 10000)
//! - `TICKER_DEFAULT_REFRESH_INTERVAL_MS`: Idle scheduler period (default: 300000)
//! - `TICKER_CONNECTION_BUFFER`: Outbound events queued per viewer (default: 256)
//! - `TICKER_USER_AGENT`: User-Agent sent to feed hosts
//! - `TICKER_SHUTDOWN_GRACE_SECS`: Drain time for open requests (default: 10)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: dashboard-ticker)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use dashboard_ticker::application::ports::{DashboardRepository, TickerSource};
use dashboard_ticker::infrastructure::http::{AppState, HttpServer};
use dashboard_ticker::infrastructure::telemetry;
use dashboard_ticker::{
    BroadcastGateway, HttpFeedFetcher, InMemoryDashboardStore, ServiceConfig, TickerService,
    init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (tracing + optional OTLP export)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Dashboard Ticker");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = ServiceConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let store = Arc::new(InMemoryDashboardStore::new());
    let source: Arc<dyn TickerSource> = store.clone();
    let repository: Arc<dyn DashboardRepository> = store;

    let gateway = Arc::new(BroadcastGateway::new(config.broadcast.connection_buffer));
    let fetcher = Arc::new(
        HttpFeedFetcher::new(&config.fetch.user_agent, config.fetch.timeout)
            .context("failed to build feed HTTP client")?,
    );

    let service = Arc::new(TickerService::new(
        source,
        fetcher,
        gateway.clone(),
        config.ticker_settings(),
    ));

    service.scheduler().start().await;

    let state = Arc::new(AppState::new(
        service.clone(),
        repository,
        gateway,
        shutdown_token.clone(),
    ));
    let server = HttpServer::new(config.server.http_port, state, shutdown_token.clone());

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    tracing::info!("Dashboard ticker ready");

    await_shutdown(shutdown_token).await;

    service.scheduler().stop();

    if tokio::time::timeout(config.server.shutdown_grace, server_handle)
        .await
        .is_err()
    {
        tracing::warn!(
            grace_secs = config.server.shutdown_grace.as_secs(),
            "HTTP server did not drain in time"
        );
    }

    tracing::info!("Dashboard ticker stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        fetch_timeout_ms = config.fetch.timeout.as_millis(),
        default_refresh_interval_ms = config.fetch.default_refresh_interval.as_millis(),
        connection_buffer = config.broadcast.connection_buffer,
        "Configuration loaded"
    );
    tracing::debug!(user_agent = %config.fetch.user_agent, "Feed client");
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!("Graceful shutdown started");
}
