//! facility CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use facility_client::cli::{Cli, Command, ConfigAction};
use facility_client::commands::reservation::{self, OutputMode};
use facility_client::commands::{config as config_cmd, server};
use facility_client::config::ClientConfig;
use facility_client::error::{ClientError, ClientResult};
use facility_core::{TracingConfig, init_tracing};
use facility_protocol::Request;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let debug = cli.debug || config.debug;
    let tracing = match cli.command {
        Command::Server { .. } if !debug => TracingConfig::server(),
        _ => TracingConfig::cli(debug),
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    if let Some(ref path) = cli.config {
        ClientConfig::load_from(path).map_err(ClientError::Config)
    } else {
        Ok(ClientConfig::load().unwrap_or_default())
    }
}

async fn run(cli: Cli, mut config: ClientConfig) -> ClientResult<()> {

    config
        .server
        .apply_overrides(cli.host, cli.port, cli.timeout, cli.attempts);
    let mode = OutputMode::from_flag(cli.json);

    if !matches!(cli.command, Command::Config { .. }) {
        config.validate().map_err(ClientError::Config)?;
    }

    match cli.command {
        Command::Server { bind, listen_port } => server::run(&config, bind, listen_port).await,
        Command::Facilities => reservation::facilities(),
        Command::Config { action } => match action {
            ConfigAction::Dump => config_cmd::dump(&config),
            ConfigAction::Validate => config_cmd::validate(&config),
            ConfigAction::Path => config_cmd::path(),
        },
        Command::Availability { facility, days } => {
            let mut client = reservation::connect(&config.server).await?;
            reservation::request(&mut client, Request::availability(facility, days), mode).await
        }
        Command::Book {
            facility,
            start,
            end,
        } => {
            let mut client = reservation::connect(&config.server).await?;
            reservation::request(&mut client, Request::book(facility, start, end), mode).await
        }
        Command::Update {
            confirmation_id,
            offset,
        } => {
            let mut client = reservation::connect(&config.server).await?;
            reservation::request(&mut client, Request::change(confirmation_id, offset), mode)
                .await
        }
        Command::Observe { facility, minutes } => {
            let mut client = reservation::connect(&config.server).await?;
            reservation::observe(&mut client, &facility, minutes, mode).await
        }
        Command::Ping => {
            let mut client = reservation::connect(&config.server).await?;
            reservation::ping(&mut client).await
        }
    }
}
