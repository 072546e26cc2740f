//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the ticker engine services, the request DTOs they
//! validate, and the port interfaces that connect them to storage, feed
//! fetching and viewer delivery.

/// Validated inputs for dashboard, feed and content mutations.
pub mod dto;

/// Port interfaces for external systems (store, fetcher, publisher).
pub mod ports;

/// Ticker aggregation, caching and scheduling services.
pub mod services;
