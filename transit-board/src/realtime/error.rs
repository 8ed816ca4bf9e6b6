//! Feed client error types.

use std::fmt;
use std::time::Duration;

/// Errors from fetching or decoding one realtime feed.
#[derive(Debug)]
pub enum FeedError {
    /// HTTP request failed (network error, connection reset, etc.)
    Http(reqwest::Error),

    /// The source did not answer within its timeout
    Timeout(Duration),

    /// Invalid API key or unauthorized
    Unauthorized,

    /// Rate limited by the feed provider
    RateLimited,

    /// Feed returned an error status code
    Api { status: u16, message: String },

    /// Payload is not a valid feed message
    Decode(prost::DecodeError),

    /// Reading a local feed file failed
    Io(std::io::Error),

    /// Payload exceeded the size cap
    TooLarge { limit: usize },
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Http(e) => write!(f, "HTTP error: {e}"),
            FeedError::Timeout(after) => write!(f, "timed out after {}s", after.as_secs_f64()),
            FeedError::Unauthorized => write!(f, "unauthorized (invalid API key)"),
            FeedError::RateLimited => write!(f, "rate limited by feed provider"),
            FeedError::Api { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            FeedError::Decode(e) => write!(f, "malformed feed payload: {e}"),
            FeedError::Io(e) => write!(f, "I/O error: {e}"),
            FeedError::TooLarge { limit } => {
                write!(f, "payload larger than {limit} bytes")
            }
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Http(e) => Some(e),
            FeedError::Decode(e) => Some(e),
            FeedError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err)
    }
}

impl From<prost::DecodeError> for FeedError {
    fn from(err: prost::DecodeError) -> Self {
        FeedError::Decode(err)
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        FeedError::Io(err)
    }
}

/// A feed aggregation failed because one of its sources did.
#[derive(Debug, thiserror::Error)]
#[error("feed {name} (source #{index}) failed: {error}")]
pub struct FetchFailure {
    /// Position of the source in declaration order
    pub index: usize,
    pub name: String,
    #[source]
    pub error: FeedError,
}
