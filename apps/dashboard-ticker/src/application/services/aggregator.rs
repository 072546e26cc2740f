//! Ticker Aggregator
//!
//! Builds one dashboard's ticker: fetches every subscribed feed in
//! parallel, normalizes and ranks the entries, writes the cache and
//! publishes the result.
//!
//! # Concurrency
//!
//! At most one run per dashboard is in flight. Each dashboard has an async
//! run token; [`TickerAggregator::refresh`] waits for it (out-of-cycle
//! triggers queue behind a running refresh) while
//! [`TickerAggregator::try_refresh`] gives up immediately (scheduled ticks
//! coalesce with a running refresh).
//!
//! A refresh returns the list it committed. A run overtaken by a clear
//! commits nothing and returns the cache's current list instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::Instant;

use super::dashboard_locks::{DashboardLock, DashboardLocks};
use super::error::TickerError;
use super::ticker_cache::{ClearEpoch, TickerCache};
use crate::application::ports::{EventPublisher, FeedFetcher, FetchError, TickerSource};
use crate::domain::dashboard::{DashboardId, FeedSource};
use crate::domain::event::DashboardEvent;
use crate::domain::ticker::{RawEntry, TickerItem, normalize, rank_and_truncate};
use crate::infrastructure::metrics::{self, RefreshTrigger};

/// Fetches, merges, caches and publishes dashboard tickers.
pub struct TickerAggregator {
    source: Arc<dyn TickerSource>,
    fetcher: Arc<dyn FeedFetcher>,
    publisher: Arc<dyn EventPublisher>,
    cache: Arc<TickerCache>,
    fetch_timeout: Duration,
    run_tokens: DashboardLocks,
}

impl TickerAggregator {
    /// Create an aggregator.
    ///
    /// Every feed fetch is abandoned after `fetch_timeout`.
    #[must_use]
    pub fn new(
        source: Arc<dyn TickerSource>,
        fetcher: Arc<dyn FeedFetcher>,
        publisher: Arc<dyn EventPublisher>,
        cache: Arc<TickerCache>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            fetcher,
            publisher,
            cache,
            fetch_timeout,
            run_tokens: DashboardLocks::default(),
        }
    }

    /// Refresh a dashboard, waiting for any run already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`TickerError::UnknownDashboard`] if the dashboard does not
    /// exist, or [`TickerError::Store`] if the store fails.
    pub async fn refresh(&self, dashboard: &DashboardId) -> Result<Vec<TickerItem>, TickerError> {
        let token = self.run_token(dashboard);
        let _guard = token.lock().await;
        self.run(dashboard, RefreshTrigger::OnDemand).await
    }

    /// Refresh a dashboard unless a run is already in flight.
    ///
    /// Returns `None` when the dashboard was busy.
    pub async fn try_refresh(
        &self,
        dashboard: &DashboardId,
    ) -> Option<Result<Vec<TickerItem>, TickerError>> {
        let token = self.run_token(dashboard);
        let Ok(_guard) = token.try_lock() else {
            metrics::record_refresh_skipped();
            return None;
        };
        Some(self.run(dashboard, RefreshTrigger::Scheduled).await)
    }

    /// Release everything held for a deleted dashboard.
    ///
    /// Waits for a run in flight to finish, then drops the cached entry.
    /// The run token itself is only dropped when nobody else holds or
    /// waits on it, so a queued refresh still runs alone.
    pub async fn forget(&self, dashboard: &DashboardId) {
        self.run_tokens
            .retire(dashboard, || self.cache.remove(dashboard))
            .await;
    }

    /// Whether a run for the dashboard is in flight.
    #[must_use]
    pub fn is_refreshing(&self, dashboard: &DashboardId) -> bool {
        self.run_tokens.is_held(dashboard)
    }

    pub(crate) fn run_token(&self, dashboard: &DashboardId) -> DashboardLock {
        self.run_tokens.get(dashboard)
    }

    #[tracing::instrument(skip_all, fields(dashboard = %dashboard, trigger = trigger.as_str()))]
    async fn run(
        &self,
        dashboard: &DashboardId,
        trigger: RefreshTrigger,
    ) -> Result<Vec<TickerItem>, TickerError> {
        let started = Instant::now();
        let epoch = self.cache.epoch(dashboard);

        let config = self
            .source
            .get_config(dashboard)
            .await
            .inspect_err(|_| metrics::record_refresh_failure())?;

        if !config.ticker_enabled {
            self.commit(dashboard, Vec::new(), epoch, started);
            tracing::debug!("Ticker disabled, published empty list");
            return Ok(Vec::new());
        }

        let feeds = self
            .source
            .list_feed_sources(dashboard)
            .await
            .inspect_err(|_| metrics::record_refresh_failure())?;

        let fetched = join_all(feeds.iter().map(|feed| self.fetch_feed(dashboard, feed))).await;

        let now = Utc::now();
        let merged: Vec<TickerItem> = feeds
            .iter()
            .zip(fetched)
            .flat_map(|(feed, entries)| entries.into_iter().map(move |e| normalize(e, feed, now)))
            .collect();

        let merged_count = merged.len();
        let items = rank_and_truncate(merged, config.max_ticker_items);

        if !self.commit(dashboard, items.clone(), epoch, started) {
            tracing::debug!(
                discarded = items.len(),
                "Dashboard cleared during refresh, result discarded"
            );
            return Ok(self.cache.items(dashboard));
        }

        let elapsed = started.elapsed();
        metrics::record_refresh(trigger, elapsed);
        tracing::info!(
            feeds = feeds.len(),
            merged = merged_count,
            kept = items.len(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Ticker refreshed"
        );

        Ok(items)
    }

    fn commit(
        &self,
        dashboard: &DashboardId,
        items: Vec<TickerItem>,
        epoch: ClearEpoch,
        started: Instant,
    ) -> bool {
        self.cache
            .write_if_current(dashboard, items, epoch, started, |stored| {
                self.publisher
                    .publish(dashboard, DashboardEvent::Ticker(stored.to_vec()));
            })
    }

    async fn fetch_feed(&self, dashboard: &DashboardId, feed: &FeedSource) -> Vec<RawEntry> {
        let result = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(feed))
            .await
            .unwrap_or(Err(FetchError::Timeout(self.fetch_timeout)));

        match result {
            Ok(entries) => entries,
            Err(e) => {
                metrics::record_feed_failure(e.kind());
                tracing::warn!(
                    dashboard = %dashboard,
                    feed_id = %feed.id,
                    url = %feed.url,
                    error = %e,
                    "Feed fetch failed"
                );
                Vec::new()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
