//! Relay server command.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use passage_relay::RelayConfig;

use crate::output;

#[derive(Args, Debug)]
pub struct RelayCommand {
    #[command(subcommand)]
    pub command: RelaySubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RelaySubcommand {
    /// Serve the relay until interrupted
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address (overrides PASSAGE_RELAY_BIND)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

pub async fn handle(cmd: RelayCommand) -> Result<()> {
    match cmd.command {
        RelaySubcommand::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = RelayConfig::from_env().context("Invalid relay configuration")?;
    if let Some(bind) = args.bind {
        config = config.with_bind(bind);
    }

    if config.api_base.is_none() {
        output::warning("PASSAGE_API_BASE is not set; /api/session/refresh is disabled");
    }
    eprintln!(
        "{} {}",
        "Relay listening on".dimmed(),
        format!("http://{}", config.bind).bold()
    );

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            trigger.cancel();
        }
    });

    passage_relay::serve(config, shutdown)
        .await
        .context("Relay server failed")?;

    output::success("Relay stopped");
    Ok(())
}
