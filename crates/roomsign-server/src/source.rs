//! Feed sources.
//!
//! A [`FeedSource`] produces the raw text of a calendar feed. Parsing happens
//! later, in the service, so sources stay oblivious to calendar semantics.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServerResult;

/// A boxed future, as returned by [`FeedSource::fetch`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Wire format of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFormat {
    /// Decide from the body: a leading `[` or `{` means JSON.
    #[default]
    Auto,
    /// iCalendar text.
    Ical,
    /// Google-Calendar-style JSON event list.
    Json,
}

impl FeedFormat {
    /// Guesses the format from a file extension, falling back to `Auto`.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            Some(ext) if ext.eq_ignore_ascii_case("ics") || ext.eq_ignore_ascii_case("ical") => {
                Self::Ical
            }
            _ => Self::Auto,
        }
    }

    /// Wraps `body` in a payload of this format.
    pub fn payload(self, body: String) -> FeedPayload {
        let json = match self {
            Self::Ical => false,
            Self::Json => true,
            Self::Auto => matches!(body.trim_start().chars().next(), Some('[' | '{')),
        };
        if json {
            FeedPayload::Json(body)
        } else {
            FeedPayload::Ical(body)
        }
    }
}

/// Raw feed text tagged with its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedPayload {
    Ical(String),
    Json(String),
}

impl FeedPayload {
    /// Returns the raw text.
    pub fn body(&self) -> &str {
        match self {
            Self::Ical(body) | Self::Json(body) => body,
        }
    }
}

/// Something that can fetch a calendar feed.
pub trait FeedSource: Send + Sync {
    /// Human-readable description used in logs.
    fn name(&self) -> &str;

    /// Fetches the current feed contents.
    fn fetch(&self) -> BoxFuture<'_, ServerResult<FeedPayload>>;
}

/// Reads the feed from a local file on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    format: FeedFormat,
}

impl FileSource {
    /// Creates a source for `path`, guessing the format from its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = FeedFormat::from_path(&path);
        Self {
            name: path.display().to_string(),
            path,
            format,
        }
    }

    /// Builder: force the feed format.
    pub fn with_format(mut self, format: FeedFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> BoxFuture<'_, ServerResult<FeedPayload>> {
        Box::pin(async move {
            let body = tokio::fs::read_to_string(&self.path).await?;
            debug!(path = %self.path.display(), bytes = body.len(), "Read feed file");
            Ok(self.format.payload(body))
        })
    }
}

/// Serves a fixed payload. Useful for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticSource {
    payload: FeedPayload,
}

impl StaticSource {
    pub fn new(payload: FeedPayload) -> Self {
        Self { payload }
    }
}

impl FeedSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self) -> BoxFuture<'_, ServerResult<FeedPayload>> {
        let payload = self.payload.clone();
        Box::pin(async move { Ok(payload) })
    }
}

#[cfg(feature = "http")]
pub use http::HttpSource;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use tracing::debug;

    use super::{BoxFuture, FeedFormat, FeedPayload, FeedSource};
    use crate::error::{ServerError, ServerResult};

    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Downloads the feed over HTTP(S).
    #[derive(Debug, Clone)]
    pub struct HttpSource {
        http_client: reqwest::Client,
        url: String,
        format: FeedFormat,
    }

    impl HttpSource {
        /// Creates a source for `url` with the default timeout.
        pub fn new(url: impl Into<String>) -> ServerResult<Self> {
            Self::with_timeout(url, DEFAULT_TIMEOUT)
        }

        /// Creates a source for `url` with the given request timeout.
        pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> ServerResult<Self> {
            let http_client = reqwest::Client::builder().timeout(timeout).build()?;
            Ok(Self {
                http_client,
                url: url.into(),
                format: FeedFormat::Auto,
            })
        }

        /// Builder: force the feed format.
        pub fn with_format(mut self, format: FeedFormat) -> Self {
            self.format = format;
            self
        }

        pub fn url(&self) -> &str {
            &self.url
        }
    }

    impl FeedSource for HttpSource {
        fn name(&self) -> &str {
            &self.url
        }

        fn fetch(&self) -> BoxFuture<'_, ServerResult<FeedPayload>> {
            Box::pin(async move {
                let response = self.http_client.get(&self.url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ServerError::http_status(&self.url, status.as_u16()));
                }
                let body = response.text().await?;
                debug!(url = %self.url, bytes = body.len(), "Downloaded feed");
                Ok(self.format.payload(body))
            })
        }
    }
}
