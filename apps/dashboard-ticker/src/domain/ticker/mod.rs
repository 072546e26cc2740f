//! Ticker Items
//!
//! Canonical ticker entries and the pure functions that produce them:
//! normalization of loosely structured feed entries, and ranking of the
//! merged list.
//!
//! Nothing in this module performs I/O or can fail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dashboard::FeedSource;

/// Title used when a feed entry carries none.
pub const UNTITLED: &str = "No title";

// =============================================================================
// Raw Entry
// =============================================================================

/// A feed entry as parsed from the document, before normalization.
///
/// Every field is optional; parsers fill what the document provides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Source-provided unique id (RSS `guid`, Atom `id`).
    pub guid: Option<String>,
    /// Entry link.
    pub link: Option<String>,
    /// Entry title.
    pub title: Option<String>,
    /// Publication date exactly as written in the document.
    pub published: Option<String>,
}

// =============================================================================
// Ticker Item
// =============================================================================

/// One displayable ticker entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerItem {
    /// `{feed id}-{guid | link | timestamp}`.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Entry link, empty if the entry has none.
    pub link: String,
    /// Publication instant.
    pub pub_date: DateTime<Utc>,
    /// Display name of the owning feed.
    pub feed_name: String,
    /// Id of the owning feed.
    pub feed_id: String,
    /// Logo of the owning feed.
    pub feed_logo: Option<String>,
}

/// Convert one raw entry into a ticker item.
///
/// Missing or empty fields degrade to defaults: the id falls back from guid
/// to link to the current millisecond timestamp, the title to [`UNTITLED`],
/// the link to an empty string, and the publication instant to `now`.
#[must_use]
pub fn normalize(entry: RawEntry, feed: &FeedSource, now: DateTime<Utc>) -> TickerItem {
    let RawEntry {
        guid,
        link,
        title,
        published,
    } = entry;

    let guid = non_empty(guid);
    let link = non_empty(link);

    let native_id = guid
        .or_else(|| link.clone())
        .unwrap_or_else(|| now.timestamp_millis().to_string());

    TickerItem {
        id: format!("{}-{native_id}", feed.id),
        title: non_empty(title).unwrap_or_else(|| UNTITLED.to_string()),
        link: link.unwrap_or_default(),
        pub_date: published
            .as_deref()
            .and_then(parse_instant)
            .unwrap_or(now),
        feed_name: feed.display_name().to_string(),
        feed_id: feed.id.clone(),
        feed_logo: non_empty(feed.logo.clone()),
    }
}

/// Parse a feed date in RFC 2822 (RSS) or RFC 3339 (Atom) form.
#[must_use]
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|d| d.to_utc())
        .ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// Ranking
// =============================================================================

/// Sort newest first and keep at most `max_items` entries.
///
/// Items are not de-duplicated: a story carried by two feeds appears once
/// per feed. The relative order of items with equal publication instants
/// is unspecified.
#[must_use]
pub fn rank_and_truncate(mut items: Vec<TickerItem>, max_items: usize) -> Vec<TickerItem> {
    items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
    items.truncate(max_items);
    items
}

// =============================================================================
// Tests
// =============================================================================
