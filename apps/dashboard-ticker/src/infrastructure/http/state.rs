//! Shared handler state.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::application::ports::DashboardRepository;
use crate::application::services::TickerService;
use crate::infrastructure::broadcast::BroadcastGateway;

/// Everything the HTTP and WebSocket handlers need.
pub struct AppState {
    /// Ticker engine.
    pub service: Arc<TickerService>,
    /// Dashboard store.
    pub repository: Arc<dyn DashboardRepository>,
    /// Viewer registry.
    pub gateway: Arc<BroadcastGateway>,
    /// Service version reported by `/health`.
    pub version: String,
    /// Process start, for uptime.
    pub started_at: Instant,
    /// Cancelled when the service begins shutting down.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Bundle the handler dependencies.
    #[must_use]
    pub fn new(
        service: Arc<TickerService>,
        repository: Arc<dyn DashboardRepository>,
        gateway: Arc<BroadcastGateway>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            service,
            repository,
            gateway,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            shutdown,
        }
    }
}

/// Shared state reference.
pub type SharedState = Arc<AppState>;
