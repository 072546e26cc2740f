//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Per-connection event delivery to WebSocket viewers.
pub mod broadcast;

/// Environment-driven service configuration.
pub mod config;

/// HTTP retrieval and parsing of RSS/Atom feeds.
pub mod fetcher;

/// REST API, WebSocket endpoint, health probes and metrics.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// In-memory dashboard store.
pub mod store;

/// OpenTelemetry tracing integration.
pub mod telemetry;
