//! CLI argument definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use passage_core::{BaseUrl, ClientConfig};

use crate::commands::passkey::PasskeyCommand;
use crate::commands::relay::RelayCommand;
use crate::commands::request::RequestArgs;
use crate::commands::session::SessionCommand;

/// Session relay and passkey toolkit.
#[derive(Parser, Debug)]
#[command(name = "passage")]
#[command(author, version = env!("PASSAGE_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub target: Target,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where relayed calls go and where the session lives.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Origin serving the relay (e.g. http://127.0.0.1:8787)
    #[arg(long, env = "PASSAGE_APP_ORIGIN", global = true)]
    pub app_origin: Option<String>,

    /// Backend base URL that request paths resolve against
    #[arg(long, env = "PASSAGE_API_BASE", global = true)]
    pub api_base: Option<String>,

    /// Session file (defaults to the user data directory)
    #[arg(long, env = "PASSAGE_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,
}

impl Target {
    /// Build a client configuration, failing if either URL is missing.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let app_origin = self
            .app_origin
            .as_deref()
            .context("--app-origin (or PASSAGE_APP_ORIGIN) is required")?;
        let api_base = self
            .api_base
            .as_deref()
            .context("--api-base (or PASSAGE_API_BASE) is required")?;

        Ok(ClientConfig::new(
            BaseUrl::new(app_origin).context("Invalid app origin")?,
            BaseUrl::new(api_base).context("Invalid API base")?,
        ))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the request relay
    Relay(RelayCommand),

    /// Inspect and manage the stored session
    Session(SessionCommand),

    /// Send an authenticated call through the relay
    Request(RequestArgs),

    /// Passkey queries
    Passkey(PasskeyCommand),
}
