//! Service configuration.

use std::time::Duration;

use roomsign_core::{DEFAULT_OPEN_KEYWORD, FormatOptions};
use roomsign_feeds::SanitizeOptions;

/// Default interval between feed refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Zone day boundaries, statuses and floating feed values are read in.
    pub timezone: chrono_tz::Tz,

    /// Summary keyword marking open time.
    pub keyword: String,

    /// How long a fetched feed stays fresh.
    pub refresh_interval: Duration,

    /// Whether to keep serving the last feed when a refresh fails.
    pub serve_stale: bool,

    /// How times and statuses are rendered.
    pub format: FormatOptions,

    /// Repairs applied to iCalendar input.
    pub sanitize: SanitizeOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            keyword: DEFAULT_OPEN_KEYWORD.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            serve_stale: true,
            format: FormatOptions::default(),
            sanitize: SanitizeOptions::default(),
        }
    }
}

impl ServiceConfig {
    /// Creates a configuration for the given display timezone.
    pub fn new(timezone: chrono_tz::Tz) -> Self {
        Self {
            timezone,
            ..Default::default()
        }
    }

    /// Builder: set the open keyword.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    /// Builder: set the refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Builder: set stale serving.
    pub fn with_serve_stale(mut self, serve_stale: bool) -> Self {
        self.serve_stale = serve_stale;
        self
    }

    /// Builder: set format options.
    pub fn with_format(mut self, format: FormatOptions) -> Self {
        self.format = format;
        self
    }

    /// Builder: set sanitize options.
    pub fn with_sanitize(mut self, sanitize: SanitizeOptions) -> Self {
        self.sanitize = sanitize;
        self
    }
}
