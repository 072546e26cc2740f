//! Dashboard, feed and content DTOs

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::dashboard::DashboardId;

/// Rejected management input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    /// Dashboard id missing.
    #[error("Dashboard ID is required")]
    MissingDashboardId,
    /// Dashboard id contains forbidden characters.
    #[error("Invalid dashboard ID format. Use only letters, numbers, dashes, and underscores.")]
    MalformedDashboardId,
    /// URL missing.
    #[error("URL is required")]
    MissingUrl,
    /// URL is not absolute or does not parse.
    #[error("Invalid URL format")]
    MalformedUrl,
    /// Logo URL is not absolute or does not parse.
    #[error("Invalid logo URL format")]
    MalformedLogoUrl,
}

fn is_valid_url(raw: &str) -> bool {
    Url::parse(raw).is_ok()
}

fn is_set(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

// =============================================================================
// Dashboards
// =============================================================================

/// Request to create a dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDashboard {
    /// Requested id.
    #[serde(default)]
    pub id: String,
    /// Display name (defaults to the id).
    pub name: Option<String>,
    /// Description (defaults to empty).
    pub description: Option<String>,
}

impl NewDashboard {
    /// Validate and return the requested id.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if the id is missing or malformed.
    pub fn validate(&self) -> Result<DashboardId, InvalidInput> {
        if self.id.is_empty() {
            return Err(InvalidInput::MissingDashboardId);
        }
        let id = DashboardId::new(self.id.clone());
        if !id.is_well_formed() {
            return Err(InvalidInput::MalformedDashboardId);
        }
        Ok(id)
    }
}

/// Partial dashboard update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardUpdate {
    /// New name; ignored when empty.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
}

// =============================================================================
// Feeds
// =============================================================================

/// Request to subscribe a dashboard to a feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFeed {
    /// Display name (defaults to the URL).
    pub name: Option<String>,
    /// Feed location.
    #[serde(default)]
    pub url: String,
    /// Optional logo location.
    pub logo: Option<String>,
}

impl NewFeed {
    /// Check the URL and logo.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if the URL is missing or either URL is malformed.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if self.url.is_empty() {
            return Err(InvalidInput::MissingUrl);
        }
        if !is_valid_url(&self.url) {
            return Err(InvalidInput::MalformedUrl);
        }
        if let Some(logo) = self.logo.as_deref().filter(|l| !l.is_empty())
            && !is_valid_url(logo)
        {
            return Err(InvalidInput::MalformedLogoUrl);
        }
        Ok(())
    }
}

/// Partial feed update.
///
/// An empty `logo` removes the logo; an absent one keeps it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedUpdate {
    /// New name; ignored when empty.
    pub name: Option<String>,
    /// New location; ignored when empty.
    pub url: Option<String>,
    /// New logo, or empty to remove it.
    pub logo: Option<String>,
}

impl FeedUpdate {
    /// Check any URL being changed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if a provided URL is malformed.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if let Some(url) = self.url.as_ref().filter(|u| !u.is_empty())
            && !is_valid_url(url)
        {
            return Err(InvalidInput::MalformedUrl);
        }
        if is_set(self.logo.as_ref()) && !self.logo.as_deref().is_some_and(is_valid_url) {
            return Err(InvalidInput::MalformedLogoUrl);
        }
        Ok(())
    }
}

// =============================================================================
// Content
// =============================================================================

/// Request to add a playlist entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewContent {
    /// Page or media location.
    #[serde(default)]
    pub url: String,
    /// Display title (defaults to the URL).
    pub title: Option<String>,
    /// Content kind (defaults to `webpage`).
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl NewContent {
    /// Check the URL.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if the URL is missing or malformed.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if self.url.is_empty() {
            return Err(InvalidInput::MissingUrl);
        }
        if !is_valid_url(&self.url) {
            return Err(InvalidInput::MalformedUrl);
        }
        Ok(())
    }
}

/// Partial playlist entry update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentUpdate {
    /// New location; ignored when empty.
    pub url: Option<String>,
    /// New title; ignored when empty.
    pub title: Option<String>,
    /// New kind; ignored when empty.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ContentUpdate {
    /// Check the URL if it is being changed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if the provided URL is malformed.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if is_set(self.url.as_ref()) && !self.url.as_deref().is_some_and(is_valid_url) {
            return Err(InvalidInput::MalformedUrl);
        }
        Ok(())
    }
}
