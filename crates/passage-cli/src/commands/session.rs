//! Session commands.

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;

use passage_core::TokenSet;

use crate::cli::Target;
use crate::output;
use crate::session::open_store;

#[derive(Args, Debug)]
pub struct SessionCommand {
    #[command(subcommand)]
    pub command: SessionSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionSubcommand {
    /// Display the stored session (tokens redacted)
    Show,

    /// Exchange the refresh token for a new token set
    Refresh,

    /// Clear the stored session
    Logout,

    /// Store an existing token set
    Import(ImportArgs),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[arg(long)]
    pub access_token: String,

    #[arg(long)]
    pub refresh_token: String,

    #[arg(long, default_value = "Bearer")]
    pub token_type: String,
}

pub async fn handle(cmd: SessionCommand, target: &Target) -> Result<()> {
    match cmd.command {
        SessionSubcommand::Show => show(target).await,
        SessionSubcommand::Refresh => refresh(target).await,
        SessionSubcommand::Logout => logout(target).await,
        SessionSubcommand::Import(args) => import(args, target).await,
    }
}

async fn show(target: &Target) -> Result<()> {
    let store = open_store(target)?;
    match store.read().await.context("Failed to read session")? {
        Some(tokens) => {
            output::field("State", "authenticated");
            output::field("Token type", &tokens.token_type);
            output::field("Access token", &output::redact(tokens.access_token.as_str()));
            output::field(
                "Refresh token",
                &output::redact(tokens.refresh_token.as_str()),
            );
        }
        None => output::field("State", "anonymous"),
    }
    Ok(())
}

async fn refresh(target: &Target) -> Result<()> {
    let client = super::client(target)?;
    if client
        .store()
        .refresh_token()
        .await
        .context("Failed to read session")?
        .is_none()
    {
        bail!("No active session. Run 'passage session import' first.");
    }

    eprintln!("{}", "Refreshing session...".dimmed());

    if !client.refresher().refresh().await {
        let still_held = client.store().read().await?.is_some();
        if still_held {
            bail!("Refresh failed; the stored session was kept");
        }
        bail!("Refresh token rejected; the session was cleared");
    }

    output::success("Session refreshed successfully");
    Ok(())
}

async fn logout(target: &Target) -> Result<()> {
    let store = open_store(target)?;
    store.clear().await.context("Failed to clear session")?;
    output::success("Logged out");
    Ok(())
}

async fn import(args: ImportArgs, target: &Target) -> Result<()> {
    let store = open_store(target)?;
    store
        .write(TokenSet::new(
            args.access_token,
            args.refresh_token,
            args.token_type,
        ))
        .await
        .context("Failed to store session")?;
    output::success("Session stored");
    Ok(())
}
