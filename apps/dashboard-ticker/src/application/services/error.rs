//! Ticker engine errors

use crate::application::ports::StoreError;
use crate::domain::dashboard::DashboardId;
use crate::domain::subscription::ConnectionId;

/// Failure of a ticker engine operation.
///
/// Individual feed failures never surface here; they are absorbed by the
/// aggregator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TickerError {
    /// The dashboard does not exist. Callers are expected to check first.
    #[error("Dashboard not found: {0}")]
    UnknownDashboard(DashboardId),

    /// The connection is not registered with the publisher.
    #[error("connection {0} is not open")]
    ConnectionClosed(ConnectionId),

    /// The store failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for TickerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DashboardNotFound(id) => Self::UnknownDashboard(id),
            other => Self::Store(other),
        }
    }
}
