//! In-memory dashboard store.
//!
//! Holds dashboards with their feeds, content playlist and configuration.
//! Records keep creation order. The `default` dashboard is seeded on
//! construction and cannot be deleted; deleting any other dashboard drops
//! everything it owns.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::application::dto::{
    ContentUpdate, DashboardUpdate, FeedUpdate, NewContent, NewDashboard, NewFeed,
};
use crate::application::ports::{DashboardRepository, StoreError, TickerSource};
use crate::domain::dashboard::{
    ConfigUpdate, ContentItem, Dashboard, DashboardId, FeedSource, TickerConfig,
};

/// Name given to the seeded dashboard.
pub const DEFAULT_DASHBOARD_NAME: &str = "Default Dashboard";

/// Description given to the seeded dashboard.
pub const DEFAULT_DASHBOARD_DESCRIPTION: &str = "Default dashboard";

/// Content kind used when a request names none.
pub const DEFAULT_CONTENT_KIND: &str = "webpage";

#[derive(Debug, Clone)]
struct DashboardRecord {
    dashboard: Dashboard,
    config: TickerConfig,
    feeds: Vec<FeedSource>,
    content: Vec<ContentItem>,
}

impl DashboardRecord {
    fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard,
            config: TickerConfig::default(),
            feeds: Vec::new(),
            content: Vec::new(),
        }
    }

    fn ticker_active(&self) -> bool {
        self.config.ticker_enabled && !self.feeds.is_empty()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    order: Vec<DashboardId>,
    records: HashMap<DashboardId, DashboardRecord>,
}

impl StoreState {
    fn record(&self, dashboard: &DashboardId) -> Result<&DashboardRecord, StoreError> {
        self.records
            .get(dashboard)
            .ok_or_else(|| StoreError::DashboardNotFound(dashboard.clone()))
    }

    fn record_mut(&mut self, dashboard: &DashboardId) -> Result<&mut DashboardRecord, StoreError> {
        self.records
            .get_mut(dashboard)
            .ok_or_else(|| StoreError::DashboardNotFound(dashboard.clone()))
    }

    fn insert(&mut self, record: DashboardRecord) {
        let id = record.dashboard.id.clone();
        self.order.push(id.clone());
        self.records.insert(id, record);
    }

    fn active(&self) -> impl Iterator<Item = &DashboardRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|r| r.ticker_active())
    }
}

/// Store backed by process memory.
///
/// Data does not survive a restart.
#[derive(Debug)]
pub struct InMemoryDashboardStore {
    state: RwLock<StoreState>,
}

impl InMemoryDashboardStore {
    /// Create a store holding only the `default` dashboard.
    #[must_use]
    pub fn new() -> Self {
        let mut state = StoreState::default();
        state.insert(DashboardRecord::new(Dashboard {
            id: DashboardId::default_dashboard(),
            name: DEFAULT_DASHBOARD_NAME.to_string(),
            description: DEFAULT_DASHBOARD_DESCRIPTION.to_string(),
            created_at: Utc::now(),
        }));

        Self {
            state: RwLock::new(state),
        }
    }

    /// Number of dashboards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().order.len()
    }

    /// Always `false`; the default dashboard cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().order.is_empty()
    }
}

impl Default for InMemoryDashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// Ticker Source
// =============================================================================

#[async_trait]
impl TickerSource for InMemoryDashboardStore {
    async fn dashboard_exists(&self, dashboard: &DashboardId) -> Result<bool, StoreError> {
        Ok(self.state.read().records.contains_key(dashboard))
    }

    async fn list_feed_sources(
        &self,
        dashboard: &DashboardId,
    ) -> Result<Vec<FeedSource>, StoreError> {
        Ok(self
            .state
            .read()
            .records
            .get(dashboard)
            .map(|r| r.feeds.clone())
            .unwrap_or_default())
    }

    async fn get_config(&self, dashboard: &DashboardId) -> Result<TickerConfig, StoreError> {
        Ok(self.state.read().record(dashboard)?.config)
    }

    async fn get_content(&self, dashboard: &DashboardId) -> Result<Vec<ContentItem>, StoreError> {
        Ok(self
            .state
            .read()
            .records
            .get(dashboard)
            .map(|r| r.content.clone())
            .unwrap_or_default())
    }

    async fn list_ticker_enabled_with_feeds(&self) -> Result<Vec<DashboardId>, StoreError> {
        Ok(self
            .state
            .read()
            .active()
            .map(|r| r.dashboard.id.clone())
            .collect())
    }

    async fn minimum_enabled_refresh_interval(&self) -> Result<Option<Duration>, StoreError> {
        Ok(self
            .state
            .read()
            .active()
            .map(|r| r.config.refresh_interval())
            .min())
    }
}

// =============================================================================
// Dashboard Repository
// =============================================================================

#[async_trait]
impl DashboardRepository for InMemoryDashboardStore {
    async fn list_dashboards(&self) -> Result<Vec<Dashboard>, StoreError> {
        let state = self.state.read();
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .map(|r| r.dashboard.clone())
            .collect())
    }

    async fn get_dashboard(&self, dashboard: &DashboardId) -> Result<Dashboard, StoreError> {
        Ok(self.state.read().record(dashboard)?.dashboard.clone())
    }

    async fn create_dashboard(&self, request: NewDashboard) -> Result<Dashboard, StoreError> {
        let id = request.validate()?;

        let mut state = self.state.write();
        if state.records.contains_key(&id) {
            return Err(StoreError::DashboardExists(id));
        }

        let dashboard = Dashboard {
            name: non_empty(request.name).unwrap_or_else(|| id.to_string()),
            description: request.description.unwrap_or_default(),
            id,
            created_at: Utc::now(),
        };
        state.insert(DashboardRecord::new(dashboard.clone()));
        drop(state);

        tracing::info!(dashboard = %dashboard.id, "Dashboard created");
        Ok(dashboard)
    }

    async fn update_dashboard(
        &self,
        dashboard: &DashboardId,
        update: DashboardUpdate,
    ) -> Result<Dashboard, StoreError> {
        let mut state = self.state.write();
        let record = state.record_mut(dashboard)?;

        if let Some(name) = non_empty(update.name) {
            record.dashboard.name = name;
        }
        if let Some(description) = update.description {
            record.dashboard.description = description;
        }
        Ok(record.dashboard.clone())
    }

    async fn delete_dashboard(&self, dashboard: &DashboardId) -> Result<(), StoreError> {
        if dashboard.is_default() {
            return Err(StoreError::DefaultDashboardProtected);
        }

        let mut state = self.state.write();
        let removed = state
            .records
            .remove(dashboard)
            .ok_or_else(|| StoreError::DashboardNotFound(dashboard.clone()))?;
        state.order.retain(|id| id != dashboard);
        drop(state);

        tracing::info!(
            dashboard = %dashboard,
            feeds = removed.feeds.len(),
            content = removed.content.len(),
            "Dashboard deleted"
        );
        Ok(())
    }

    async fn create_feed(
        &self,
        dashboard: &DashboardId,
        request: NewFeed,
    ) -> Result<FeedSource, StoreError> {
        request.validate()?;

        let mut state = self.state.write();
        let record = state.record_mut(dashboard)?;

        let feed = FeedSource {
            id: Uuid::new_v4().to_string(),
            name: non_empty(request.name).unwrap_or_else(|| request.url.clone()),
            url: request.url,
            logo: non_empty(request.logo),
            created_at: Utc::now(),
        };
        record.feeds.push(feed.clone());
        Ok(feed)
    }

    async fn update_feed(
        &self,
        dashboard: &DashboardId,
        feed_id: &str,
        update: FeedUpdate,
    ) -> Result<FeedSource, StoreError> {
        update.validate()?;

        let mut state = self.state.write();
        let feed = state
            .records
            .get_mut(dashboard)
            .and_then(|r| r.feeds.iter_mut().find(|f| f.id == feed_id))
            .ok_or_else(|| StoreError::FeedNotFound(feed_id.to_string()))?;

        if let Some(name) = non_empty(update.name) {
            feed.name = name;
        }
        if let Some(url) = non_empty(update.url) {
            feed.url = url;
        }
        if let Some(logo) = update.logo {
            feed.logo = non_empty(Some(logo));
        }
        Ok(feed.clone())
    }

    async fn delete_feed(&self, dashboard: &DashboardId, feed_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let feeds = state
            .records
            .get_mut(dashboard)
            .map(|r| &mut r.feeds)
            .ok_or_else(|| StoreError::FeedNotFound(feed_id.to_string()))?;

        let before = feeds.len();
        feeds.retain(|f| f.id != feed_id);
        if feeds.len() == before {
            return Err(StoreError::FeedNotFound(feed_id.to_string()));
        }
        Ok(())
    }

    async fn create_content(
        &self,
        dashboard: &DashboardId,
        request: NewContent,
    ) -> Result<ContentItem, StoreError> {
        request.validate()?;

        let mut state = self.state.write();
        let record = state.record_mut(dashboard)?;

        let item = ContentItem {
            id: Uuid::new_v4().to_string(),
            title: non_empty(request.title).unwrap_or_else(|| request.url.clone()),
            url: request.url,
            kind: non_empty(request.kind).unwrap_or_else(|| DEFAULT_CONTENT_KIND.to_string()),
            created_at: Utc::now(),
        };
        record.content.push(item.clone());
        Ok(item)
    }

    async fn update_content(
        &self,
        dashboard: &DashboardId,
        content_id: &str,
        update: ContentUpdate,
    ) -> Result<ContentItem, StoreError> {
        update.validate()?;

        let mut state = self.state.write();
        let item = state
            .records
            .get_mut(dashboard)
            .and_then(|r| r.content.iter_mut().find(|c| c.id == content_id))
            .ok_or_else(|| StoreError::ContentNotFound(content_id.to_string()))?;

        if let Some(url) = non_empty(update.url) {
            item.url = url;
        }
        if let Some(title) = non_empty(update.title) {
            item.title = title;
        }
        if let Some(kind) = non_empty(update.kind) {
            item.kind = kind;
        }
        Ok(item.clone())
    }

    async fn delete_content(
        &self,
        dashboard: &DashboardId,
        content_id: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let content = state
            .records
            .get_mut(dashboard)
            .map(|r| &mut r.content)
            .ok_or_else(|| StoreError::ContentNotFound(content_id.to_string()))?;

        let before = content.len();
        content.retain(|c| c.id != content_id);
        if content.len() == before {
            return Err(StoreError::ContentNotFound(content_id.to_string()));
        }
        Ok(())
    }

    async fn update_config(
        &self,
        dashboard: &DashboardId,
        update: ConfigUpdate,
    ) -> Result<TickerConfig, StoreError> {
        let mut state = self.state.write();
        let record = state.record_mut(dashboard)?;

        record.config = record.config.apply(&update)?;
        Ok(record.config)
    }
}

// =============================================================================
// Tests
// =============================================================================
