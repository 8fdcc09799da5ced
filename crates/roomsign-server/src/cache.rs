//! Single-flight calendar cache with TTL.
//!
//! The cache holds one value, the last successfully parsed feed. Callers ask
//! for it through [`CalendarCache::get_or_refresh`]; when it has expired the
//! first caller refreshes it while the others wait on the same lock and then
//! reuse the new value.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::ServerResult;

/// A cached value and its freshness.
#[derive(Debug)]
pub struct CacheEntry<T> {
    /// Cached value.
    pub value: Arc<T>,
    /// When the value was fetched.
    pub refreshed_at: DateTime<Utc>,
    /// When the value expires (monotonic clock).
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value: Arc::new(value),
            refreshed_at: Utc::now(),
            expires_at: Instant::now() + ttl,
        }
    }

    /// Returns true if the entry has expired.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Returns the time until expiration.
    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Cache around a single refreshable value.
#[derive(Debug)]
pub struct CalendarCache<T> {
    ttl: Duration,
    serve_stale: bool,
    entry: Mutex<Option<CacheEntry<T>>>,
}

impl<T> CalendarCache<T> {
    /// Creates an empty cache.
    ///
    /// With `serve_stale`, a failed refresh returns the previous value
    /// instead of the error.
    pub fn new(ttl: Duration, serve_stale: bool) -> Self {
        Self {
            ttl,
            serve_stale,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value, refreshing it first when missing or expired.
    ///
    /// The lock is held across `refresh`, so at most one refresh runs at a
    /// time and waiting callers see its result.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> ServerResult<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ServerResult<T>>,
    {
        let mut entry = self.entry.lock().await;

        if let Some(current) = entry.as_ref() {
            if !current.is_expired() {
                trace!(
                    expires_in_ms = current.time_until_expiry().as_millis() as u64,
                    "Cache hit"
                );
                return Ok(Arc::clone(&current.value));
            }
            debug!(refreshed_at = %current.refreshed_at, "Cache entry expired");
        }

        match refresh().await {
            Ok(value) => {
                let fresh = CacheEntry::new(value, self.ttl);
                info!(ttl_secs = self.ttl.as_secs(), "Refreshed calendar feed");
                let value = Arc::clone(&fresh.value);
                *entry = Some(fresh);
                Ok(value)
            }
            Err(err) => match entry.as_ref() {
                Some(stale) if self.serve_stale => {
                    warn!(
                        error = %err,
                        refreshed_at = %stale.refreshed_at,
                        "Feed refresh failed, serving stale value"
                    );
                    Ok(Arc::clone(&stale.value))
                }
                _ => Err(err),
            },
        }
    }

    /// Returns the cached value without refreshing, even if expired.
    pub async fn peek(&self) -> Option<Arc<T>> {
        self.entry
            .lock()
            .await
            .as_ref()
            .map(|e| Arc::clone(&e.value))
    }

    /// When the cached value was last refreshed.
    pub async fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.entry.lock().await.as_ref().map(|e| e.refreshed_at)
    }

    /// Drops the cached value so the next call refreshes.
    pub async fn invalidate(&self) {
        if self.entry.lock().await.take().is_some() {
            debug!("Invalidated calendar cache");
        }
    }
}
