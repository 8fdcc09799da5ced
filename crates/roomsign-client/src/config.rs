//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/roomsign/config.toml` by default. Command-line flags override
//! the file through [`ClientConfig::apply_cli`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use roomsign_core::{DEFAULT_OPEN_KEYWORD, FormatOptions, TimeFormat};
use roomsign_core::format::DEFAULT_CLOSED_TEXT;
use roomsign_server::{FeedFormat, FeedSource, FileSource, ServerError, ServiceConfig};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};

/// Configuration for the roomsign client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Where the feed comes from.
    pub feed: FeedSettings,

    /// Display settings.
    pub display: DisplaySettings,

    /// Refresh settings.
    pub cache: CacheSettings,
}

/// Feed location and format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Local feed file.
    pub path: Option<PathBuf>,

    /// Feed URL, used when no path is set.
    pub url: Option<String>,

    /// Feed format; `auto` sniffs the body.
    pub format: FeedFormat,

    /// HTTP timeout in seconds.
    pub timeout: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            path: None,
            url: None,
            format: FeedFormat::Auto,
            timeout: 30,
        }
    }
}

/// Display settings for output formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// IANA timezone name, UTC when unset.
    pub timezone: Option<String>,

    /// Summary keyword marking open time.
    pub keyword: String,

    /// Clock style.
    pub time_format: TimeFormat,

    /// Text for days without open hours.
    pub closed_text: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            timezone: None,
            keyword: DEFAULT_OPEN_KEYWORD.to_string(),
            time_format: TimeFormat::default(),
            closed_text: DEFAULT_CLOSED_TEXT.to_string(),
        }
    }
}

/// Feed refresh settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Seconds a fetched feed stays fresh.
    pub refresh_seconds: u64,

    /// Keep serving the last feed when a refresh fails.
    pub serve_stale: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            refresh_seconds: 300,
            serve_stale: true,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults when absent.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::config(format!("failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| ClientError::config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roomsign")
    }

    /// Overrides file settings with command-line flags.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if cli.debug {
            self.debug = true;
        }
        if let Some(path) = &cli.file {
            self.feed.path = Some(path.clone());
            self.feed.url = None;
        }
        if let Some(url) = &cli.url {
            self.feed.url = Some(url.clone());
            self.feed.path = None;
        }
        if cli.json_feed {
            self.feed.format = FeedFormat::Json;
        }
        if let Some(timezone) = &cli.timezone {
            self.display.timezone = Some(timezone.clone());
        }
        if let Some(keyword) = &cli.keyword {
            self.display.keyword = keyword.clone();
        }
        if cli.h24 {
            self.display.time_format = TimeFormat::H24;
        }
    }

    /// Parses the configured display timezone.
    pub fn timezone(&self) -> ClientResult<chrono_tz::Tz> {
        match &self.display.timezone {
            Some(name) => name
                .parse::<chrono_tz::Tz>()
                .map_err(|_| ClientError::config(format!("unknown timezone: {}", name))),
            None => Ok(chrono_tz::UTC),
        }
    }

    /// Builds the service configuration.
    pub fn service_config(&self) -> ClientResult<ServiceConfig> {
        Ok(ServiceConfig::new(self.timezone()?)
            .with_keyword(self.display.keyword.clone())
            .with_refresh_interval(Duration::from_secs(self.cache.refresh_seconds))
            .with_serve_stale(self.cache.serve_stale)
            .with_format(
                FormatOptions::default()
                    .with_time_format(self.display.time_format)
                    .with_closed_text(self.display.closed_text.clone()),
            ))
    }

    /// Builds the configured feed source.
    pub fn source(&self) -> ClientResult<Box<dyn FeedSource>> {
        if let Some(path) = &self.feed.path {
            let source = FileSource::new(path);
            let source = match self.feed.format {
                FeedFormat::Auto => source,
                format => source.with_format(format),
            };
            return Ok(Box::new(source));
        }

        if let Some(url) = &self.feed.url {
            return self.http_source(url);
        }

        Err(ServerError::SourceNotConfigured.into())
    }

    #[cfg(feature = "http")]
    fn http_source(&self, url: &str) -> ClientResult<Box<dyn FeedSource>> {
        let source = roomsign_server::HttpSource::with_timeout(
            url,
            Duration::from_secs(self.feed.timeout),
        )?
        .with_format(self.feed.format);
        Ok(Box::new(source))
    }

    #[cfg(not(feature = "http"))]
    fn http_source(&self, url: &str) -> ClientResult<Box<dyn FeedSource>> {
        Err(ClientError::config(format!(
            "cannot fetch {}: built without HTTP support",
            url
        )))
    }

    /// Checks that the configuration can produce a working service.
    pub fn validate(&self) -> ClientResult<()> {
        self.timezone()?;
        if self.feed.path.is_none() && self.feed.url.is_none() {
            return Err(ClientError::config("no feed path or url configured"));
        }
        if self.display.keyword.trim().is_empty() {
            return Err(ClientError::config("display.keyword must not be empty"));
        }
        Ok(())
    }
}
