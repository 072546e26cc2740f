//! Event Publisher Port (Driven Port)
//!
//! Interface for delivering dashboard events to connected viewers.
//!
//! Implementations must never block the caller: a viewer that cannot keep
//! up loses events rather than slowing publication to everyone else.

use crate::domain::dashboard::DashboardId;
use crate::domain::event::DashboardEvent;
use crate::domain::subscription::ConnectionId;

/// Port for fanning dashboard events out to viewers.
pub trait EventPublisher: Send + Sync {
    /// Deliver an event to every viewer of the dashboard.
    ///
    /// Returns the number of viewers whose queue accepted the event.
    fn publish(&self, dashboard: &DashboardId, event: DashboardEvent) -> usize;

    /// Add a viewer to a dashboard and queue `replay` for it alone.
    ///
    /// Membership and replay happen atomically with respect to
    /// [`publish`](Self::publish): any event published afterwards is queued
    /// behind the replay. Returns `false` if the connection is unknown.
    fn join(
        &self,
        connection: ConnectionId,
        dashboard: &DashboardId,
        replay: Vec<DashboardEvent>,
    ) -> bool;

    /// Remove a viewer from a dashboard.
    fn leave(&self, connection: ConnectionId, dashboard: &DashboardId) -> bool;

    /// Remove every viewer from a dashboard that no longer exists.
    ///
    /// Connections stay open. Returns the number of viewers removed.
    fn evict(&self, dashboard: &DashboardId) -> usize;

    /// Queue an event for one connection regardless of membership.
    fn send_to(&self, connection: ConnectionId, dashboard: &DashboardId, event: DashboardEvent)
    -> bool;
}
