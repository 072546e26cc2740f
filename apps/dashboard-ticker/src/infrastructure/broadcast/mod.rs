//! Broadcast Gateway
//!
//! Fans dashboard events out to connected viewers.
//!
//! # Architecture
//!
//! Every viewer connection owns a bounded outbound queue. The gateway keeps
//! the queues and the [`SubscriptionTable`] behind one lock, so a viewer
//! joining a dashboard and an event being published to it are ordered: the
//! viewer either gets the event or the replay that already reflects it.
//!
//! Queues are never awaited. When a viewer's queue is full the event is
//! dropped for that viewer only and counted in
//! `dashboard_ticker_events_dropped_total`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::metrics;
use crate::application::ports::EventPublisher;
use crate::domain::dashboard::DashboardId;
use crate::domain::event::{DashboardEvent, EventEnvelope};
use crate::domain::subscription::{ConnectionId, SubscriptionStats, SubscriptionTable};

/// Default outbound queue length per connection.
pub const DEFAULT_CONNECTION_BUFFER: usize = 256;

/// Receiving end of a connection's outbound queue.
pub type EventReceiver = mpsc::Receiver<Arc<EventEnvelope>>;

// =============================================================================
// Gateway State
// =============================================================================

#[derive(Debug, Default)]
struct GatewayState {
    connections: HashMap<ConnectionId, mpsc::Sender<Arc<EventEnvelope>>>,
    subscriptions: SubscriptionTable,
}

impl GatewayState {
    fn report(&self) {
        metrics::set_connections(self.connections.len());
        metrics::set_subscriptions(self.subscriptions.stats().membership_count);
    }
}

/// Outcome of queueing one envelope.
enum Delivery {
    Queued,
    Dropped,
    Closed,
}

fn deliver(tx: &mpsc::Sender<Arc<EventEnvelope>>, envelope: Arc<EventEnvelope>) -> Delivery {
    match tx.try_send(envelope) {
        Ok(()) => Delivery::Queued,
        Err(mpsc::error::TrySendError::Full(_)) => Delivery::Dropped,
        Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
    }
}

// =============================================================================
// Broadcast Gateway
// =============================================================================

/// Viewer registry and event fan-out.
///
/// # Example
///
/// ```rust
/// use dashboard_ticker::application::ports::EventPublisher;
/// use dashboard_ticker::domain::dashboard::DashboardId;
/// use dashboard_ticker::domain::event::DashboardEvent;
/// use dashboard_ticker::infrastructure::broadcast::BroadcastGateway;
///
/// let gateway = BroadcastGateway::new(16);
/// let lobby = DashboardId::new("lobby");
///
/// let (conn, mut rx) = gateway.connect();
/// assert!(gateway.join(conn, &lobby, vec![]));
///
/// assert_eq!(gateway.publish(&lobby, DashboardEvent::Ticker(vec![])), 1);
/// assert_eq!(rx.try_recv().unwrap().event.name(), "ticker:update");
/// ```
#[derive(Debug)]
pub struct BroadcastGateway {
    state: RwLock<GatewayState>,
    next_id: AtomicU64,
    capacity: usize,
}

impl BroadcastGateway {
    /// Create a gateway whose connections buffer up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(GatewayState::default()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Create a gateway with the default buffer length.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CONNECTION_BUFFER)
    }

    /// Register a new connection.
    #[must_use]
    pub fn connect(&self) -> (ConnectionId, EventReceiver) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);

        let mut state = self.state.write();
        state.connections.insert(id, tx);
        state.report();
        drop(state);

        tracing::debug!(connection = id, "Viewer connected");
        (id, rx)
    }

    /// Drop a connection and all of its memberships.
    ///
    /// Returns the dashboards it was watching.
    pub fn disconnect(&self, connection: ConnectionId) -> Vec<DashboardId> {
        let mut state = self.state.write();
        state.connections.remove(&connection);
        let dashboards = state.subscriptions.remove_connection(connection);
        state.report();
        drop(state);

        tracing::debug!(
            connection,
            dashboards = dashboards.len(),
            "Viewer disconnected"
        );
        dashboards
    }

    /// Whether a connection is registered.
    #[must_use]
    pub fn is_connected(&self, connection: ConnectionId) -> bool {
        self.state.read().connections.contains_key(&connection)
    }

    /// Connections watching a dashboard.
    #[must_use]
    pub fn viewers(&self, dashboard: &DashboardId) -> Vec<ConnectionId> {
        self.state.read().subscriptions.subscribers(dashboard)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Current connection and membership counts.
    #[must_use]
    pub fn stats(&self) -> GatewayStats {
        let state = self.state.read();
        GatewayStats {
            connections: state.connections.len(),
            subscriptions: state.subscriptions.stats(),
        }
    }
}

impl Default for BroadcastGateway {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl EventPublisher for BroadcastGateway {
    fn publish(&self, dashboard: &DashboardId, event: DashboardEvent) -> usize {
        let name = event.name();
        let envelope = Arc::new(EventEnvelope::new(dashboard.clone(), event));

        let state = self.state.read();
        let mut queued = 0_u64;
        let mut dropped = 0_u64;

        for connection in state.subscriptions.subscribers(dashboard) {
            let Some(tx) = state.connections.get(&connection) else {
                continue;
            };
            match deliver(tx, Arc::clone(&envelope)) {
                Delivery::Queued => queued += 1,
                Delivery::Dropped => {
                    dropped += 1;
                    tracing::warn!(
                        connection,
                        dashboard = %dashboard,
                        event = name,
                        "Viewer queue full, event dropped"
                    );
                }
                Delivery::Closed => {}
            }
        }
        drop(state);

        metrics::record_events_sent(name, queued);
        if dropped > 0 {
            metrics::record_events_dropped(name, dropped);
        }

        usize::try_from(queued).unwrap_or(usize::MAX)
    }

    fn join(
        &self,
        connection: ConnectionId,
        dashboard: &DashboardId,
        replay: Vec<DashboardEvent>,
    ) -> bool {
        let mut state = self.state.write();
        let Some(tx) = state.connections.get(&connection).cloned() else {
            return false;
        };

        state.subscriptions.join(connection, dashboard);
        state.report();

        for event in replay {
            let name = event.name();
            let envelope = Arc::new(EventEnvelope::new(dashboard.clone(), event));
            match deliver(&tx, envelope) {
                Delivery::Queued => metrics::record_events_sent(name, 1),
                Delivery::Dropped => metrics::record_events_dropped(name, 1),
                Delivery::Closed => break,
            }
        }

        true
    }

    fn leave(&self, connection: ConnectionId, dashboard: &DashboardId) -> bool {
        let mut state = self.state.write();
        let left = state.subscriptions.leave(connection, dashboard);
        state.report();
        left
    }

    fn evict(&self, dashboard: &DashboardId) -> usize {
        let mut state = self.state.write();
        let evicted = state.subscriptions.remove_dashboard(dashboard);
        state.report();
        drop(state);

        if !evicted.is_empty() {
            tracing::debug!(
                dashboard = %dashboard,
                viewers = evicted.len(),
                "Viewers evicted from removed dashboard"
            );
        }
        evicted.len()
    }

    fn send_to(
        &self,
        connection: ConnectionId,
        dashboard: &DashboardId,
        event: DashboardEvent,
    ) -> bool {
        let name = event.name();
        let state = self.state.read();
        let Some(tx) = state.connections.get(&connection) else {
            return false;
        };

        match deliver(tx, Arc::new(EventEnvelope::new(dashboard.clone(), event))) {
            Delivery::Queued => {
                metrics::record_events_sent(name, 1);
                true
            }
            Delivery::Dropped => {
                metrics::record_events_dropped(name, 1);
                false
            }
            Delivery::Closed => false,
        }
    }
}

/// Shared gateway reference.
pub type SharedBroadcastGateway = Arc<BroadcastGateway>;

/// Statistics about viewers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Open connections.
    pub connections: usize,
    /// Dashboard memberships.
    pub subscriptions: SubscriptionStats,
}

// =============================================================================
// Tests
// =============================================================================
