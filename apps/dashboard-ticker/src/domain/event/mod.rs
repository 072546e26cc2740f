//! Dashboard Events
//!
//! Updates pushed to a dashboard's viewers. On the wire each event is an
//! [`EventEnvelope`]:
//!
//! ```json
//! {"dashboard": "lobby", "event": "ticker:update", "data": [ ... ]}
//! ```

use serde::{Deserialize, Serialize};

use super::dashboard::{ContentItem, DashboardId, TickerConfig};
use super::ticker::TickerItem;

/// Message sent to a viewer whose dashboard request could not be served.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load dashboard data";

/// One update for a dashboard's viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum DashboardEvent {
    /// The ticker list was replaced.
    #[serde(rename = "ticker:update")]
    Ticker(Vec<TickerItem>),
    /// The content playlist changed.
    #[serde(rename = "content:update")]
    Content(Vec<ContentItem>),
    /// The configuration changed.
    #[serde(rename = "config:update")]
    Config(TickerConfig),
    /// A dashboard request failed.
    #[serde(rename = "dashboard:error")]
    Error(ErrorPayload),
}

impl DashboardEvent {
    /// Error event with the standard load-failure message.
    #[must_use]
    pub fn load_failed() -> Self {
        Self::Error(ErrorPayload {
            error: LOAD_FAILED_MESSAGE.to_string(),
        })
    }

    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ticker(_) => "ticker:update",
            Self::Content(_) => "content:update",
            Self::Config(_) => "config:update",
            Self::Error(_) => "dashboard:error",
        }
    }
}

/// Body of a `dashboard:error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human readable reason.
    pub error: String,
}

/// An event addressed to one dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Dashboard the event belongs to.
    pub dashboard: DashboardId,
    /// The event itself.
    #[serde(flatten)]
    pub event: DashboardEvent,
}

impl EventEnvelope {
    /// Address an event to a dashboard.
    #[must_use]
    pub const fn new(dashboard: DashboardId, event: DashboardEvent) -> Self {
        Self { dashboard, event }
    }
}
