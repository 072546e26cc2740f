//! Feed Fetcher Port (Driven Port)
//!
//! Interface for retrieving and parsing a single feed document.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::dashboard::FeedSource;
use crate::domain::ticker::RawEntry;

/// Failure to retrieve or parse one feed.
///
/// Always recovered at the aggregation boundary: a failing feed contributes
/// zero entries to its dashboard's ticker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Network or connection error.
    #[error("feed transport error: {message}")]
    Transport {
        /// Underlying error text.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("feed responded with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Document is neither valid RSS nor valid Atom.
    #[error("feed document could not be parsed: {message}")]
    Parse {
        /// Parser error text.
        message: String,
    },

    /// Retrieval did not finish in time.
    #[error("feed fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Parse { .. } => "parse",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Port for fetching the entries of one feed source.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Retrieve and parse the feed, returning its raw entries in document order.
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>, FetchError>;
}
