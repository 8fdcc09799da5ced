//! Feed fetching and caching for roomsign.
//!
//! This crate provides:
//! - [`FeedSource`] implementations reading a feed from a file or over HTTP
//! - [`CalendarCache`], a single-flight cache with TTL and stale serving
//! - [`RoomSignService`], which answers schedule, status and event queries
//!
//! # Example
//!
//! ```rust,no_run
//! use roomsign_server::{FileSource, RoomSignService, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::new(chrono_tz::America::New_York);
//!     let service = RoomSignService::new(FileSource::new("room.ics"), config);
//!
//!     let status = service.status().await?;
//!     println!("open: {} {}", status.open, status.until);
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod error;
mod service;
mod source;

pub use cache::{CacheEntry, CalendarCache};
pub use config::{DEFAULT_REFRESH_INTERVAL, ServiceConfig};
pub use error::{ServerError, ServerResult};
pub use service::{LoadedFeed, RoomSignService};
#[cfg(feature = "http")]
pub use source::HttpSource;
pub use source::{BoxFuture, FeedFormat, FeedPayload, FeedSource, FileSource, StaticSource};
