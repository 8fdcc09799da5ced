//! roomsign CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use roomsign_core::{TracingConfig, init_tracing};
use roomsign_server::RoomSignService;

use roomsign_client::cli::{Cli, Command, ConfigAction};
use roomsign_client::commands;
use roomsign_client::config::ClientConfig;
use roomsign_client::error::ClientResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };
    config.apply_cli(&cli);

    let service = || -> ClientResult<RoomSignService> {
        Ok(RoomSignService::from_boxed(
            config.source()?,
            config.service_config()?,
        ))
    };

    match cli.command.unwrap_or(Command::Status) {
        Command::Schedule => commands::schedule::run(&service()?, cli.json).await,
        Command::Status => commands::status::run(&service()?, cli.json).await,
        Command::Events { days } => commands::events::run(&service()?, days, cli.json).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
