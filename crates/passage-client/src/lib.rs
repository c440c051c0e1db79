//! passage-client - Relay-routed HTTP client for passage.
//!
//! Every backend call is wrapped in a relay payload and posted to the
//! same-origin relay, which attaches credentials and forwards it. The client
//! renews an expired session once per call through a shared
//! [`RefreshCoordinator`], and drives the two passkey ceremonies.
//!
//! ```no_run
//! use passage_client::RequestClient;
//! use passage_core::{BaseUrl, ClientConfig, SessionStore};
//!
//! # async fn example() -> passage_core::Result<()> {
//! let config = ClientConfig::new(
//!     BaseUrl::new("https://wallet.example.com")?,
//!     BaseUrl::new("https://api.example.com")?,
//! );
//! let client = RequestClient::new(config, SessionStore::in_memory())?;
//! let profile: serde_json::Value = client.get("/user/profile").await?;
//! # Ok(())
//! # }
//! ```

mod assertion;
mod ceremony;
mod client;
mod envelope;
mod refresh;
mod registration;
mod relay;
pub mod wire;

pub use assertion::{AssertionCeremony, AssertionState, passkey_enabled};
pub use ceremony::FailureReason;
pub use client::{MAX_AUTH_RETRIES, RequestClient};
pub use envelope::ApiResponse;
pub use refresh::RefreshCoordinator;
pub use registration::{
    RegistrationCeremony, RegistrationOutcome, RegistrationState, VerificationProof,
};
pub use relay::{Headers, RelayPayload, RelayReply, RelayTransport};

pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;
