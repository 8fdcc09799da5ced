//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// roomsign - Room availability from a calendar feed
#[derive(Debug, Parser)]
#[command(name = "roomsign")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "ROOMSIGN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    // --- Feed flags ---
    /// Read the feed from a local file
    #[arg(long, group = "feed_source")]
    pub file: Option<PathBuf>,

    /// Download the feed from a URL
    #[arg(long, group = "feed_source", env = "ROOMSIGN_URL")]
    pub url: Option<String>,

    /// Treat the feed as a JSON event list instead of iCalendar
    #[arg(long)]
    pub json_feed: bool,

    // --- Display flags ---
    /// IANA timezone for day boundaries and displayed times
    #[arg(long, env = "ROOMSIGN_TIMEZONE")]
    pub timezone: Option<String>,

    /// Summary keyword marking open time
    #[arg(long)]
    pub keyword: Option<String>,

    /// Use 24-hour times
    #[arg(long)]
    pub h24: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the open hours of the next seven days
    Schedule,

    /// Show whether the room is open now (default)
    Status,

    /// List event instances of the coming days
    Events {
        /// Number of days, starting today
        #[arg(long, default_value_t = 7)]
        days: u32,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
