//! Dashboard Store Ports (Driven Ports)
//!
//! The persistent store owns dashboards, feed sources, content and
//! configuration. The aggregation engine only ever reads from it through
//! [`TickerSource`]; the request layer mutates it through
//! [`DashboardRepository`].

use std::time::Duration;

use async_trait::async_trait;

use crate::application::dto::{
    ContentUpdate, DashboardUpdate, FeedUpdate, InvalidInput, NewContent, NewDashboard, NewFeed,
};
use crate::domain::dashboard::{
    ConfigUpdate, ConfigValidationError, ContentItem, Dashboard, DashboardId, FeedSource,
    TickerConfig,
};

/// Store operation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// No dashboard with this id.
    #[error("Dashboard not found")]
    DashboardNotFound(DashboardId),

    /// No feed with this id in the dashboard.
    #[error("Feed not found")]
    FeedNotFound(String),

    /// No content item with this id in the dashboard.
    #[error("Content not found")]
    ContentNotFound(String),

    /// A dashboard with this id already exists.
    #[error("Dashboard with this ID already exists")]
    DashboardExists(DashboardId),

    /// The `default` dashboard cannot be deleted.
    #[error("Cannot delete default dashboard")]
    DefaultDashboardProtected,

    /// Request input rejected.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    /// Configuration update rejected.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigValidationError),

    /// Backend failure.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Backend error text.
        message: String,
    },
}

/// Read-only view of the store consumed by the aggregation engine.
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Whether the dashboard exists.
    async fn dashboard_exists(&self, dashboard: &DashboardId) -> Result<bool, StoreError>;

    /// Feed sources subscribed by the dashboard.
    async fn list_feed_sources(&self, dashboard: &DashboardId)
    -> Result<Vec<FeedSource>, StoreError>;

    /// The dashboard's configuration.
    ///
    /// Fails with [`StoreError::DashboardNotFound`] for an unknown dashboard.
    async fn get_config(&self, dashboard: &DashboardId) -> Result<TickerConfig, StoreError>;

    /// The dashboard's content playlist.
    async fn get_content(&self, dashboard: &DashboardId) -> Result<Vec<ContentItem>, StoreError>;

    /// Dashboards with the ticker enabled and at least one feed source.
    async fn list_ticker_enabled_with_feeds(&self) -> Result<Vec<DashboardId>, StoreError>;

    /// Smallest refresh interval among those dashboards, `None` if there are none.
    async fn minimum_enabled_refresh_interval(&self) -> Result<Option<Duration>, StoreError>;
}

/// Management operations used by the request layer.
#[async_trait]
pub trait DashboardRepository: TickerSource {
    /// All dashboards.
    async fn list_dashboards(&self) -> Result<Vec<Dashboard>, StoreError>;

    /// One dashboard.
    async fn get_dashboard(&self, dashboard: &DashboardId) -> Result<Dashboard, StoreError>;

    /// Create a dashboard together with its default configuration.
    async fn create_dashboard(&self, request: NewDashboard) -> Result<Dashboard, StoreError>;

    /// Rename or re-describe a dashboard.
    async fn update_dashboard(
        &self,
        dashboard: &DashboardId,
        update: DashboardUpdate,
    ) -> Result<Dashboard, StoreError>;

    /// Delete a dashboard and everything it owns.
    async fn delete_dashboard(&self, dashboard: &DashboardId) -> Result<(), StoreError>;

    /// Subscribe a dashboard to a feed.
    async fn create_feed(
        &self,
        dashboard: &DashboardId,
        request: NewFeed,
    ) -> Result<FeedSource, StoreError>;

    /// Change a feed source.
    async fn update_feed(
        &self,
        dashboard: &DashboardId,
        feed_id: &str,
        update: FeedUpdate,
    ) -> Result<FeedSource, StoreError>;

    /// Unsubscribe a dashboard from a feed.
    async fn delete_feed(&self, dashboard: &DashboardId, feed_id: &str) -> Result<(), StoreError>;

    /// Append a playlist entry.
    async fn create_content(
        &self,
        dashboard: &DashboardId,
        request: NewContent,
    ) -> Result<ContentItem, StoreError>;

    /// Change a playlist entry.
    async fn update_content(
        &self,
        dashboard: &DashboardId,
        content_id: &str,
        update: ContentUpdate,
    ) -> Result<ContentItem, StoreError>;

    /// Remove a playlist entry.
    async fn delete_content(
        &self,
        dashboard: &DashboardId,
        content_id: &str,
    ) -> Result<(), StoreError>;

    /// Apply a partial configuration update and return the result.
    async fn update_config(
        &self,
        dashboard: &DashboardId,
        update: ConfigUpdate,
    ) -> Result<TickerConfig, StoreError>;
}
