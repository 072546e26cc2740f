//! Tenant Ticker Cache
//!
//! In-process map from dashboard to its latest ranked ticker list.
//!
//! # Consistency
//!
//! Every mutation runs a caller-supplied closure while the cache lock is
//! still held. The services use it to publish the matching event, so
//! viewers observe cache transitions in exactly the order they happened.
//! The closures must not take the cache lock again.
//!
//! Each entry carries a clear epoch. A refresh captures the epoch when it
//! starts and its write is rejected if the dashboard was cleared since,
//! so a slow run can never resurrect items after a disable or delete.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::domain::dashboard::DashboardId;
use crate::domain::ticker::TickerItem;

/// Opaque clear counter captured at the start of a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ClearEpoch(u64);

/// Point-in-time copy of one dashboard's cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerSnapshot {
    /// Ranked items, possibly empty.
    pub items: Vec<TickerItem>,
    /// Wall-clock time of the last successful refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct CacheEntry {
    items: Vec<TickerItem>,
    refreshed_at: Option<DateTime<Utc>>,
    refreshed_instant: Option<Instant>,
    epoch: ClearEpoch,
}

/// Per-dashboard ticker cache.
///
/// Reads never fail: a dashboard that was never refreshed reads as empty.
#[derive(Debug, Default)]
pub struct TickerCache {
    entries: Mutex<HashMap<DashboardId, CacheEntry>>,
}

impl TickerCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current items for a dashboard.
    #[must_use]
    pub fn items(&self, dashboard: &DashboardId) -> Vec<TickerItem> {
        self.entries
            .lock()
            .get(dashboard)
            .map(|e| e.items.clone())
            .unwrap_or_default()
    }

    /// Items together with the last refresh time.
    #[must_use]
    pub fn snapshot(&self, dashboard: &DashboardId) -> TickerSnapshot {
        self.entries
            .lock()
            .get(dashboard)
            .map(|e| TickerSnapshot {
                items: e.items.clone(),
                refreshed_at: e.refreshed_at,
            })
            .unwrap_or_default()
    }

    /// Monotonic instant of the last recorded refresh, if any.
    #[must_use]
    pub fn last_refresh(&self, dashboard: &DashboardId) -> Option<Instant> {
        self.entries
            .lock()
            .get(dashboard)
            .and_then(|e| e.refreshed_instant)
    }

    /// Epoch to hand back to [`write_if_current`](Self::write_if_current).
    #[must_use]
    pub fn epoch(&self, dashboard: &DashboardId) -> ClearEpoch {
        self.entries
            .lock()
            .get(dashboard)
            .map(|e| e.epoch)
            .unwrap_or_default()
    }

    /// Replace a dashboard's items unless it was cleared after `epoch`.
    ///
    /// `started` is recorded as the refresh instant. On success
    /// `on_commit` runs with the stored items before the lock is released.
    /// Returns whether the write was applied.
    pub fn write_if_current<F>(
        &self,
        dashboard: &DashboardId,
        items: Vec<TickerItem>,
        epoch: ClearEpoch,
        started: Instant,
        on_commit: F,
    ) -> bool
    where
        F: FnOnce(&[TickerItem]),
    {
        let mut entries = self.entries.lock();
        let entry = entries.entry(dashboard.clone()).or_default();

        if entry.epoch != epoch {
            return false;
        }

        entry.items = items;
        entry.refreshed_at = Some(Utc::now());
        entry.refreshed_instant = Some(started);
        on_commit(&entry.items);
        true
    }

    /// Empty a dashboard's entry and invalidate in-flight refreshes.
    ///
    /// The last refresh time is forgotten, so the dashboard becomes due
    /// as soon as it is eligible again. `on_clear` runs before the lock is
    /// released.
    pub fn clear<F>(&self, dashboard: &DashboardId, on_clear: F)
    where
        F: FnOnce(),
    {
        let mut entries = self.entries.lock();
        let entry = entries.entry(dashboard.clone()).or_default();

        entry.items.clear();
        entry.refreshed_at = None;
        entry.refreshed_instant = None;
        entry.epoch = ClearEpoch(entry.epoch.0 + 1);
        on_clear();
    }

    /// Drop a dashboard's entry entirely.
    ///
    /// Only safe once no refresh of the dashboard can still commit; a later
    /// write recreates the entry from scratch. Returns whether an entry
    /// existed.
    pub fn remove(&self, dashboard: &DashboardId) -> bool {
        self.entries.lock().remove(dashboard).is_some()
    }

    /// Run `f` on a dashboard's items while holding the lock.
    ///
    /// No write or clear can interleave with `f`.
    pub fn with_items<R, F>(&self, dashboard: &DashboardId, f: F) -> R
    where
        F: FnOnce(&[TickerItem]) -> R,
    {
        let entries = self.entries.lock();
        let items = entries.get(dashboard).map_or(&[][..], |e| e.items.as_slice());
        f(items)
    }

    /// Number of dashboards with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no dashboard has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
