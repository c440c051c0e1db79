//! Passkey commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::Target;
use crate::output;

#[derive(Args, Debug)]
pub struct PasskeyCommand {
    #[command(subcommand)]
    pub command: PasskeySubcommand,
}

#[derive(Subcommand, Debug)]
pub enum PasskeySubcommand {
    /// Check whether an account can sign in with a passkey
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    pub username: String,
}

pub async fn handle(cmd: PasskeyCommand, target: &Target) -> Result<()> {
    match cmd.command {
        PasskeySubcommand::Check(args) => check(args, target).await,
    }
}

async fn check(args: CheckArgs, target: &Target) -> Result<()> {
    let client = super::client(target)?;
    let path = client.config().endpoints.passkey_check.clone();

    let enabled = passage_client::passkey_enabled(&client, &path, &args.username)
        .await
        .context("Passkey check failed")?;

    output::field("Username", &args.username);
    output::field("Passkey", if enabled { "enabled" } else { "disabled" });
    Ok(())
}
