//! HTTP Feed Fetcher
//!
//! Retrieves feed documents over HTTP(S) and parses them as RSS or Atom.
//!
//! Documents mentioning `<rss` are read as RSS. Anything else is read as
//! Atom first and as RSS if that fails.

pub mod atom;
pub mod rss;

use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{FeedFetcher, FetchError};
use crate::domain::dashboard::FeedSource;
use crate::domain::ticker::RawEntry;

/// [`FeedFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedFetcher {
    /// Build a fetcher with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the TLS backend cannot be
    /// initialized.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                message: e.to_string(),
            })?;

        Ok(Self { client, timeout })
    }

    fn map_error(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    #[tracing::instrument(skip_all, fields(feed = %source.id, url = %source.url))]
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>, FetchError> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.map_error(&e))?;

        let bytes = response.bytes().await.map_err(|e| self.map_error(&e))?;
        let entries = parse_document(&bytes)?;

        tracing::debug!(entries = entries.len(), "Feed fetched");
        Ok(entries)
    }
}

/// Parse a feed document of either format.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the document is neither RSS nor Atom.
pub fn parse_document(bytes: &[u8]) -> Result<Vec<RawEntry>, FetchError> {
    if String::from_utf8_lossy(bytes).contains("<rss") {
        return rss::parse(bytes);
    }

    atom::parse(bytes).or_else(|atom_err| rss::parse(bytes).map_err(|_| atom_err))
}
