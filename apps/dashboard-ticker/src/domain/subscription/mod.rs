//! Dashboard Subscription Tracking
//!
//! Bookkeeping for which viewer connections are watching which dashboards.
//!
//! # Design
//!
//! The table is indexed both ways:
//! - dashboard → connections, used to fan an event out to its viewers
//! - connection → dashboards, used to drop every membership on disconnect
//!
//! Empty entries are removed eagerly so the table only ever holds live
//! memberships. The table itself is not synchronized; the broadcast gateway
//! owns it behind the same lock as the outbound queues.

use std::collections::{HashMap, HashSet};

use super::dashboard::DashboardId;

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a viewer connection.
pub type ConnectionId = u64;

/// Membership counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Dashboards with at least one viewer.
    pub dashboard_count: usize,
    /// Connections watching at least one dashboard.
    pub connection_count: usize,
    /// Total (connection, dashboard) pairs.
    pub membership_count: usize,
}

// =============================================================================
// Subscription Table
// =============================================================================

/// Two-way index of dashboard memberships.
///
/// # Example
///
/// ```rust
/// use dashboard_ticker::domain::dashboard::DashboardId;
/// use dashboard_ticker::domain::subscription::SubscriptionTable;
///
/// let mut table = SubscriptionTable::default();
/// let lobby = DashboardId::new("lobby");
///
/// assert!(table.join(1, &lobby));
/// assert!(!table.join(1, &lobby));
/// assert_eq!(table.subscribers(&lobby), vec![1]);
///
/// table.remove_connection(1);
/// assert!(table.subscribers(&lobby).is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    by_dashboard: HashMap<DashboardId, HashSet<ConnectionId>>,
    by_connection: HashMap<ConnectionId, HashSet<DashboardId>>,
}

impl SubscriptionTable {
    /// Add a membership.
    ///
    /// Returns `false` if the connection was already a member.
    pub fn join(&mut self, connection: ConnectionId, dashboard: &DashboardId) -> bool {
        let added = self
            .by_dashboard
            .entry(dashboard.clone())
            .or_default()
            .insert(connection);

        if added {
            self.by_connection
                .entry(connection)
                .or_default()
                .insert(dashboard.clone());
        }

        added
    }

    /// Remove a membership.
    ///
    /// Returns `false` if the connection was not a member.
    pub fn leave(&mut self, connection: ConnectionId, dashboard: &DashboardId) -> bool {
        let Some(members) = self.by_dashboard.get_mut(dashboard) else {
            return false;
        };

        if !members.remove(&connection) {
            return false;
        }

        if members.is_empty() {
            self.by_dashboard.remove(dashboard);
        }

        if let Some(dashboards) = self.by_connection.get_mut(&connection) {
            dashboards.remove(dashboard);
            if dashboards.is_empty() {
                self.by_connection.remove(&connection);
            }
        }

        true
    }

    /// Remove every membership of a connection.
    ///
    /// Returns the dashboards it was watching.
    pub fn remove_connection(&mut self, connection: ConnectionId) -> Vec<DashboardId> {
        let Some(dashboards) = self.by_connection.remove(&connection) else {
            return vec![];
        };

        for dashboard in &dashboards {
            if let Some(members) = self.by_dashboard.get_mut(dashboard) {
                members.remove(&connection);
                if members.is_empty() {
                    self.by_dashboard.remove(dashboard);
                }
            }
        }

        dashboards.into_iter().collect()
    }

    /// Remove every membership of a dashboard.
    ///
    /// Returns the connections that were watching it.
    pub fn remove_dashboard(&mut self, dashboard: &DashboardId) -> Vec<ConnectionId> {
        let Some(connections) = self.by_dashboard.remove(dashboard) else {
            return vec![];
        };

        for connection in &connections {
            if let Some(dashboards) = self.by_connection.get_mut(connection) {
                dashboards.remove(dashboard);
                if dashboards.is_empty() {
                    self.by_connection.remove(connection);
                }
            }
        }

        connections.into_iter().collect()
    }

    /// Connections currently watching a dashboard.
    #[must_use]
    pub fn subscribers(&self, dashboard: &DashboardId) -> Vec<ConnectionId> {
        self.by_dashboard
            .get(dashboard)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Dashboards a connection is watching.
    #[must_use]
    pub fn memberships(&self, connection: ConnectionId) -> Vec<DashboardId> {
        self.by_connection
            .get(&connection)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the connection is watching the dashboard.
    #[must_use]
    pub fn is_member(&self, connection: ConnectionId, dashboard: &DashboardId) -> bool {
        self.by_dashboard
            .get(dashboard)
            .is_some_and(|s| s.contains(&connection))
    }

    /// Current counts.
    #[must_use]
    pub fn stats(&self) -> SubscriptionStats {
        SubscriptionStats {
            dashboard_count: self.by_dashboard.len(),
            connection_count: self.by_connection.len(),
            membership_count: self.by_dashboard.values().map(HashSet::len).sum(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
