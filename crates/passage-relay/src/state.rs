//! Shared relay state.

use std::sync::Arc;

use passage_core::SessionKeys;

use crate::config::RelayConfig;

/// Handler state. Cheap to clone.
#[derive(Clone, Debug)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub http: reqwest::Client,
    /// Cookie names for the session tokens.
    pub keys: SessionKeys,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("passage-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config: Arc::new(config),
            http,
            keys: SessionKeys::CANONICAL,
        })
    }
}
