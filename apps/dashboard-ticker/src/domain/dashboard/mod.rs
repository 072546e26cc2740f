//! Dashboard Records
//!
//! Domain types for dashboards (tenants) and the records they own:
//! feed sources, the content playlist, and timing configuration.
//!
//! # Ownership
//!
//! A dashboard exclusively owns its feed sources, content items and its
//! single configuration record. The `default` dashboard always exists and
//! can never be deleted.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of the dashboard that always exists.
pub const DEFAULT_DASHBOARD_ID: &str = "default";

/// Opaque dashboard key, unique across the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DashboardId(String);

impl DashboardId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The distinguished `default` dashboard.
    #[must_use]
    pub fn default_dashboard() -> Self {
        Self(DEFAULT_DASHBOARD_ID.to_string())
    }

    /// Whether this is the undeletable `default` dashboard.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_DASHBOARD_ID
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is acceptable for a newly created dashboard.
    ///
    /// Only ASCII letters, digits, dashes and underscores are allowed.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

impl fmt::Display for DashboardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DashboardId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// A dashboard as exposed by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Unique key.
    pub id: DashboardId,
    /// Display name (defaults to the id).
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Feed Source
// =============================================================================

/// One subscribed feed belonging to a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSource {
    /// Identifier, unique within the owning dashboard.
    pub id: String,
    /// Display name; falls back to the URL when unset.
    pub name: String,
    /// Location of the RSS/Atom document.
    pub url: String,
    /// Optional logo shown next to ticker items.
    pub logo: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl FeedSource {
    /// Name shown to viewers: the configured name, or the URL if empty.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}

// =============================================================================
// Content
// =============================================================================

/// One entry of a dashboard's rotating content playlist.
///
/// The ticker engine never interprets content; it only forwards it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Identifier, unique within the owning dashboard.
    pub id: String,
    /// Page or media location.
    pub url: String,
    /// Display title (defaults to the URL).
    pub title: String,
    /// Content kind, `webpage` unless specified.
    #[serde(rename = "type")]
    pub kind: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Configuration
// =============================================================================

/// Per-dashboard timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerConfig {
    /// Client content-rotation cadence in milliseconds.
    pub rotation_interval: u64,
    /// Minimum time between two ticker refreshes, in milliseconds.
    pub ticker_refresh_interval: u64,
    /// Cap on ticker items retained after ranking.
    pub max_ticker_items: usize,
    /// Whether refresh/polling runs at all.
    pub ticker_enabled: bool,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            rotation_interval: 30_000,
            ticker_refresh_interval: 300_000,
            max_ticker_items: 50,
            ticker_enabled: true,
        }
    }
}

impl TickerConfig {
    /// Refresh interval as a [`Duration`].
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.ticker_refresh_interval)
    }

    /// Apply a partial update, validating the result.
    ///
    /// Fields absent from `update` keep their current value. Nothing is
    /// changed if validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValidationError`] if an interval would become zero.
    pub fn apply(&self, update: &ConfigUpdate) -> Result<Self, ConfigValidationError> {
        let next = Self {
            rotation_interval: update.rotation_interval.unwrap_or(self.rotation_interval),
            ticker_refresh_interval: update
                .ticker_refresh_interval
                .unwrap_or(self.ticker_refresh_interval),
            max_ticker_items: update.max_ticker_items.unwrap_or(self.max_ticker_items),
            ticker_enabled: update.ticker_enabled.unwrap_or(self.ticker_enabled),
        };
        next.validate()?;
        Ok(next)
    }

    /// Check the field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValidationError`] if an interval is zero.
    pub const fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.rotation_interval == 0 {
            return Err(ConfigValidationError::ZeroRotationInterval);
        }
        if self.ticker_refresh_interval == 0 {
            return Err(ConfigValidationError::ZeroRefreshInterval);
        }
        Ok(())
    }
}

/// Partial configuration update; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    /// New rotation interval (ms).
    pub rotation_interval: Option<u64>,
    /// New ticker refresh interval (ms).
    pub ticker_refresh_interval: Option<u64>,
    /// New item cap.
    pub max_ticker_items: Option<usize>,
    /// Enable or disable the ticker.
    pub ticker_enabled: Option<bool>,
}

/// Configuration constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    /// Rotation interval must be greater than zero.
    #[error("rotationInterval must be greater than 0")]
    ZeroRotationInterval,
    /// Refresh interval must be greater than zero.
    #[error("tickerRefreshInterval must be greater than 0")]
    ZeroRefreshInterval,
}

// =============================================================================
// Tests
// =============================================================================
