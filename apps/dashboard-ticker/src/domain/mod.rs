//! Domain Layer - Dashboard records, ticker items and viewer subscriptions.
//!
//! Pure types and functions with no I/O: the records a dashboard owns,
//! the normalization and ranking rules for ticker items, the events pushed
//! to viewers, and the membership table that routes them.

/// Dashboards, feed sources, content and configuration.
pub mod dashboard;

/// Events pushed to dashboard viewers.
pub mod event;

/// Viewer connection memberships.
pub mod subscription;

/// Ticker items, normalization and ranking.
pub mod ticker;
