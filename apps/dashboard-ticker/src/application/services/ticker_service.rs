//! Ticker Service
//!
//! Facade over the aggregation engine used by the request and broadcast
//! layers. Owns the cache, aggregator and scheduler, and turns store
//! mutations into refreshes and viewer events.
//!
//! # Event Ordering
//!
//! Ticker events are only published from inside the cache's critical
//! section (on write or clear), and subscribe replays the cached list from
//! inside the same section. A viewer therefore never sees an older ticker
//! after a newer one.
//!
//! Content and configuration come from the store, so each dashboard also
//! has a state gate. Subscribe holds it from the store read until the
//! viewer has joined, and every content or configuration publish holds it
//! from its own store read until the event is queued. Whatever a viewer
//! received last reflects the store as of its newest event.

use std::sync::Arc;
use std::time::Duration;

use super::aggregator::TickerAggregator;
use super::dashboard_locks::DashboardLocks;
use super::error::TickerError;
use super::scheduler::RefreshScheduler;
use super::ticker_cache::{TickerCache, TickerSnapshot};
use crate::application::ports::{EventPublisher, FeedFetcher, TickerSource};
use crate::domain::dashboard::{ConfigUpdate, ContentItem, DashboardId, TickerConfig};
use crate::domain::event::DashboardEvent;
use crate::domain::subscription::ConnectionId;
use crate::domain::ticker::TickerItem;

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerSettings {
    /// Upper bound on one feed fetch.
    pub fetch_timeout: Duration,
    /// Scheduler period when no dashboard qualifies for polling.
    pub default_refresh_interval: Duration,
}

impl Default for TickerSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            default_refresh_interval: Duration::from_millis(300_000),
        }
    }
}

/// Operations exposed to the request and broadcast layers.
pub struct TickerService {
    source: Arc<dyn TickerSource>,
    publisher: Arc<dyn EventPublisher>,
    cache: Arc<TickerCache>,
    aggregator: Arc<TickerAggregator>,
    scheduler: RefreshScheduler,
    state_gates: DashboardLocks,
}

impl TickerService {
    /// Wire up the engine. The scheduler starts idle.
    #[must_use]
    pub fn new(
        source: Arc<dyn TickerSource>,
        fetcher: Arc<dyn FeedFetcher>,
        publisher: Arc<dyn EventPublisher>,
        settings: TickerSettings,
    ) -> Self {
        let cache = Arc::new(TickerCache::new());
        let aggregator = Arc::new(TickerAggregator::new(
            Arc::clone(&source),
            fetcher,
            Arc::clone(&publisher),
            Arc::clone(&cache),
            settings.fetch_timeout,
        ));
        let scheduler = RefreshScheduler::new(
            Arc::clone(&source),
            Arc::clone(&aggregator),
            Arc::clone(&cache),
            settings.default_refresh_interval,
        );

        Self {
            source,
            publisher,
            cache,
            aggregator,
            scheduler,
            state_gates: DashboardLocks::default(),
        }
    }

    /// The recurring refresh driver.
    #[must_use]
    pub const fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    // =========================================================================
    // Ticker
    // =========================================================================

    /// Refresh a dashboard immediately, queueing behind a running refresh.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::UnknownDashboard`] for an unknown dashboard,
    /// or [`TickerError::Store`] if the store fails.
    pub async fn refresh_now(
        &self,
        dashboard: &DashboardId,
    ) -> Result<Vec<TickerItem>, TickerError> {
        self.aggregator.refresh(dashboard).await
    }

    /// Cached ticker items; empty if never refreshed.
    #[must_use]
    pub fn current_ticker_items(&self, dashboard: &DashboardId) -> Vec<TickerItem> {
        self.cache.items(dashboard)
    }

    /// Cached ticker items with their refresh time.
    #[must_use]
    pub fn ticker_snapshot(&self, dashboard: &DashboardId) -> TickerSnapshot {
        self.cache.snapshot(dashboard)
    }

    /// Empty a dashboard's ticker and publish the empty list.
    ///
    /// Refreshes already in flight for the dashboard will not repopulate it.
    pub fn clear_ticker(&self, dashboard: &DashboardId) {
        self.cache.clear(dashboard, || {
            self.publisher
                .publish(dashboard, DashboardEvent::Ticker(Vec::new()));
        });
        tracing::debug!(dashboard = %dashboard, "Ticker cleared");
    }

    // =========================================================================
    // Viewers
    // =========================================================================

    /// Add a viewer to a dashboard and replay its current state.
    ///
    /// The viewer receives the ticker, content and configuration, in that
    /// order, before any later update. If the dashboard cannot be loaded
    /// the viewer gets a `dashboard:error` event instead and does not join.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::UnknownDashboard`] for an unknown dashboard,
    /// [`TickerError::ConnectionClosed`] if the connection is gone, or
    /// [`TickerError::Store`] if the store fails.
    pub async fn subscribe(
        &self,
        connection: ConnectionId,
        dashboard: &DashboardId,
    ) -> Result<(), TickerError> {
        let gate = self.state_gates.get(dashboard);
        let _serialized = gate.lock().await;

        let (content, config) = match self.load_replay_state(dashboard).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    connection,
                    dashboard = %dashboard,
                    error = %e,
                    "Dashboard request failed"
                );
                self.publisher
                    .send_to(connection, dashboard, DashboardEvent::load_failed());
                return Err(e);
            }
        };

        let joined = self.cache.with_items(dashboard, |items| {
            self.publisher.join(
                connection,
                dashboard,
                vec![
                    DashboardEvent::Ticker(items.to_vec()),
                    DashboardEvent::Content(content),
                    DashboardEvent::Config(config),
                ],
            )
        });

        if !joined {
            return Err(TickerError::ConnectionClosed(connection));
        }

        tracing::debug!(connection, dashboard = %dashboard, "Viewer subscribed");
        Ok(())
    }

    /// Remove a viewer from a dashboard.
    pub fn unsubscribe(&self, connection: ConnectionId, dashboard: &DashboardId) -> bool {
        self.publisher.leave(connection, dashboard)
    }

    async fn load_replay_state(
        &self,
        dashboard: &DashboardId,
    ) -> Result<(Vec<ContentItem>, TickerConfig), TickerError> {
        if !self.source.dashboard_exists(dashboard).await? {
            return Err(TickerError::UnknownDashboard(dashboard.clone()));
        }
        let content = self.source.get_content(dashboard).await?;
        let config = self.source.get_config(dashboard).await?;
        Ok((content, config))
    }

    // =========================================================================
    // Mutation Hooks
    // =========================================================================

    /// Publish the dashboard's current content playlist.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError`] if the playlist cannot be read.
    pub async fn publish_content(&self, dashboard: &DashboardId) -> Result<(), TickerError> {
        let gate = self.state_gates.get(dashboard);
        let _serialized = gate.lock().await;

        let content = self.source.get_content(dashboard).await?;
        self.publisher
            .publish(dashboard, DashboardEvent::Content(content));
        Ok(())
    }

    /// React to a feed being created, updated or deleted.
    ///
    /// Refreshes the dashboard if its ticker is enabled, then rearms the
    /// scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError`] if the configuration cannot be read or the
    /// refresh fails as a whole.
    pub async fn on_feeds_changed(&self, dashboard: &DashboardId) -> Result<(), TickerError> {
        let config = self.source.get_config(dashboard).await?;
        let refreshed = if config.ticker_enabled {
            self.refresh_now(dashboard).await.map(|_| ())
        } else {
            Ok(())
        };

        self.scheduler.rearm().await;
        refreshed
    }

    /// React to a configuration update that has already been stored.
    ///
    /// Disabling the ticker clears it; enabling it refreshes the dashboard
    /// when it has feeds. The stored configuration is then published and
    /// the scheduler rearmed.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError`] if the store fails or the refresh fails as a
    /// whole. The configuration event is published regardless.
    pub async fn on_config_changed(
        &self,
        dashboard: &DashboardId,
        update: &ConfigUpdate,
        config: &TickerConfig,
    ) -> Result<(), TickerError> {
        let mut outcome = Ok(());

        if update.ticker_enabled.is_some() {
            if config.ticker_enabled {
                outcome = self.refresh_if_has_feeds(dashboard).await;
            } else {
                self.clear_ticker(dashboard);
            }
        }

        self.publish_config(dashboard, config).await;
        self.scheduler.rearm().await;
        outcome
    }

    /// React to a dashboard being deleted from the store.
    ///
    /// Viewers get an empty ticker and are then removed from the dashboard.
    /// Waits for a refresh in flight before the cached entry is dropped, so
    /// nothing of the old dashboard survives into one recreated under the
    /// same id.
    pub async fn on_dashboard_deleted(&self, dashboard: &DashboardId) {
        self.clear_ticker(dashboard);

        // Under the gate so a subscribe that loaded the old dashboard cannot
        // join after the eviction.
        let evicted = self
            .state_gates
            .retire(dashboard, || self.publisher.evict(dashboard))
            .await;

        self.aggregator.forget(dashboard).await;
        self.scheduler.rearm().await;
        tracing::info!(
            dashboard = %dashboard,
            viewers = evicted,
            "Dashboard removed from ticker engine"
        );
    }

    /// Publish the configuration as currently stored.
    ///
    /// `fallback` is sent if the store cannot be read.
    async fn publish_config(&self, dashboard: &DashboardId, fallback: &TickerConfig) {
        let gate = self.state_gates.get(dashboard);
        let _serialized = gate.lock().await;

        let config = match self.source.get_config(dashboard).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    dashboard = %dashboard,
                    error = %e,
                    "Could not re-read configuration, publishing the update as given"
                );
                *fallback
            }
        };
        self.publisher
            .publish(dashboard, DashboardEvent::Config(config));
    }

    async fn refresh_if_has_feeds(&self, dashboard: &DashboardId) -> Result<(), TickerError> {
        if self.source.list_feed_sources(dashboard).await?.is_empty() {
            return Ok(());
        }
        self.refresh_now(dashboard).await.map(|_| ())
    }
}
