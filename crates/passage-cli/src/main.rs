//! passage - run the relay and drive sessions from a terminal.
//!
//! A thin wrapper over the `passage-*` crates for manual testing against a
//! backend: import or refresh a session, issue relayed calls, and check
//! passkey eligibility.

mod cli;
mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{passkey, relay, request, session as session_cmd};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Relay(cmd) => relay::handle(cmd).await,
        Commands::Session(cmd) => session_cmd::handle(cmd, &cli.target).await,
        Commands::Request(args) => request::run(args, &cli.target).await,
        Commands::Passkey(cmd) => passkey::handle(cmd, &cli.target).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
