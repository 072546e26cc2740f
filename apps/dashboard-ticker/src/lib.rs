#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Dashboard Ticker - Per-Dashboard Feed Aggregation and Live Broadcast
//!
//! Keeps a ranked news ticker for every dashboard (tenant), built from that
//! dashboard's RSS/Atom subscriptions, and pushes ticker, content and
//! configuration changes to the dashboard's connected viewers.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `dashboard`: Dashboards, feed sources, content, configuration
//!   - `ticker`: Entry normalization and ranking
//!   - `subscription`: Viewer membership table
//!   - `event`: Events pushed to viewers
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Store, feed fetcher and event publisher interfaces
//!   - `services`: Aggregation, ticker cache, refresh scheduler
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `fetcher`: HTTP feed retrieval and RSS/Atom parsing
//!   - `store`: In-memory dashboard store
//!   - `broadcast`: Per-connection event queues
//!   - `http`: REST API, WebSocket, health and metrics
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! scheduler tick / mutation
//!         |
//!         v
//!   TickerAggregator --(fetch all feeds)--> HttpFeedFetcher --> feed hosts
//!         |
//!         v
//!    TickerCache --(ticker:update)--> BroadcastGateway --> viewers of that dashboard
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core ticker types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::dashboard::{
    ConfigUpdate, ContentItem, Dashboard, DashboardId, FeedSource, TickerConfig,
};
pub use domain::event::{DashboardEvent, EventEnvelope};
pub use domain::subscription::{ConnectionId, SubscriptionStats};
pub use domain::ticker::{RawEntry, TickerItem};

// Application services
pub use application::services::{TickerError, TickerService, TickerSettings};

// Infrastructure config
pub use infrastructure::config::{
    BroadcastSettings, ConfigError, FetchSettings, ServerSettings, ServiceConfig,
};

// Adapters (for integration tests)
pub use infrastructure::broadcast::BroadcastGateway;
pub use infrastructure::fetcher::HttpFeedFetcher;
pub use infrastructure::store::InMemoryDashboardStore;

// HTTP server
pub use infrastructure::http::{AppState, HttpServer, HttpServerError, router};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
