//! Relayed request command.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use passage_client::Method;

use crate::cli::Target;
use crate::output;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Backend path (e.g. /user/profile) or absolute URL
    pub path: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// JSON request body
    #[arg(long, short)]
    pub data: Option<String>,
}

pub async fn run(args: RequestArgs, target: &Target) -> Result<()> {
    let client = super::client(target)?;

    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid method '{}'", args.method))?;
    let data = args
        .data
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--data must be valid JSON")?;

    let response: Value = client
        .request(&args.path, method, None, data)
        .await
        .with_context(|| format!("Request to {} failed", args.path))?;

    output::json_pretty(&response)?;
    Ok(())
}
