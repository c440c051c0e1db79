//! Subcommand implementations.

pub mod passkey;
pub mod relay;
pub mod request;
pub mod session;

use anyhow::{Context, Result};

use passage_client::RequestClient;

use crate::cli::Target;

/// Build a request client over the stored session.
pub(crate) fn client(target: &Target) -> Result<RequestClient> {
    let config = target.client_config()?;
    let store = crate::session::open_store(target)?;
    RequestClient::new(config, store).context("Failed to create client")
}
