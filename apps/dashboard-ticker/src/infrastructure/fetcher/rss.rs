//! RSS 2.0 documents.

use rss::Channel;

use crate::application::ports::FetchError;
use crate::domain::ticker::RawEntry;

/// Parse an RSS channel into raw entries, in document order.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the document is not a valid channel.
pub fn parse(bytes: &[u8]) -> Result<Vec<RawEntry>, FetchError> {
    let channel = Channel::read_from(bytes).map_err(|e| FetchError::Parse {
        message: e.to_string(),
    })?;

    Ok(channel
        .items()
        .iter()
        .map(|item| RawEntry {
            guid: item.guid().map(|g| g.value().to_string()),
            link: item.link().map(str::to_string),
            title: item.title().map(str::to_string),
            published: item.pub_date().map(str::to_string),
        })
        .collect())
}
