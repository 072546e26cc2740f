//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `TickerSource`: Read-only view of dashboards, feeds and configuration
//!   consumed by the aggregation engine
//! - `DashboardRepository`: Management operations used by the request layer
//! - `FeedFetcher`: Retrieval and parsing of one feed document
//! - `EventPublisher`: Fan-out of dashboard events to viewers

mod event_publisher_port;
mod feed_fetcher_port;
mod store_port;

pub use event_publisher_port::EventPublisher;
pub use feed_fetcher_port::{FeedFetcher, FetchError};
pub use store_port::{DashboardRepository, StoreError, TickerSource};
