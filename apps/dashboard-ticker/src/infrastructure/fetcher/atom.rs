//! Atom documents.

use atom_syndication::Feed;

use crate::application::ports::FetchError;
use crate::domain::ticker::RawEntry;

/// Parse an Atom feed into raw entries, in document order.
///
/// The entry link is the first `<link>` href. The publication date is
/// `published`, falling back to the mandatory `updated`.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the document is not a valid feed.
pub fn parse(bytes: &[u8]) -> Result<Vec<RawEntry>, FetchError> {
    let feed = Feed::read_from(bytes).map_err(|e| FetchError::Parse {
        message: e.to_string(),
    })?;

    Ok(feed
        .entries()
        .iter()
        .map(|entry| RawEntry {
            guid: Some(entry.id().to_string()).filter(|id| !id.is_empty()),
            link: entry.links().first().map(|l| l.href().to_string()),
            title: Some(entry.title().as_str().to_string()).filter(|t| !t.is_empty()),
            published: Some(
                entry
                    .published()
                    .copied()
                    .unwrap_or_else(|| *entry.updated())
                    .to_rfc3339(),
            ),
        })
        .collect())
}
