//! Application Services
//!
//! The ticker engine: aggregation, caching, scheduling and the facade the
//! outer layers call.
//!
//! - `TickerAggregator`: Fetches, merges and publishes one dashboard's ticker
//! - `TickerCache`: Last ticker per dashboard, guarded by clear epochs
//! - `RefreshScheduler`: Recurring refresh of due dashboards
//! - `TickerService`: Entry point for request handlers and viewers

mod aggregator;
mod dashboard_locks;
mod error;
mod scheduler;
mod ticker_cache;
mod ticker_service;

pub use aggregator::TickerAggregator;
pub use error::TickerError;
pub use scheduler::{DUE_TOLERANCE, RefreshScheduler, TickReport, due_after};
pub use ticker_cache::{ClearEpoch, TickerCache, TickerSnapshot};
pub use ticker_service::{TickerService, TickerSettings};
