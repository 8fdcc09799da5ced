//! Server error types.

use std::io;
use thiserror::Error;

use roomsign_feeds::FeedError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while fetching or serving a feed.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error reading a local feed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The feed could not be parsed.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// HTTP transport error.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("Feed request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// No feed source was configured.
    #[error("No feed source configured")]
    SourceNotConfigured,

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }
}
