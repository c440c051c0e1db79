//! Passkey login ceremony.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use passage_core::error::CeremonyError;
use passage_core::{CredentialProvider, Result, TokenGrant, TokenSet};

use crate::RequestClient;
use crate::ceremony::{self, FailureReason};
use crate::envelope::ApiResponse;
use crate::wire::{AssertionCredentialJson, LoginStartData, PasskeyLoginRequest, UsernameRequest};

/// Where an assertion ceremony currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssertionState {
    Idle,
    CheckingEligibility,
    Starting,
    AwaitingAuthenticator,
    Verifying,
    Complete,
    Failed(FailureReason),
}

/// Signs a user in with an existing passkey.
///
/// On success the returned token set is written to the session store; no
/// earlier step touches session state. Single-use, like
/// [`RegistrationCeremony`](crate::RegistrationCeremony).
pub struct AssertionCeremony {
    client: RequestClient,
    provider: Arc<dyn CredentialProvider>,
    state: watch::Sender<AssertionState>,
}

impl AssertionCeremony {
    pub fn new(client: RequestClient, provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client,
            provider,
            state: watch::Sender::new(AssertionState::Idle),
        }
    }

    /// The current state.
    pub fn state(&self) -> AssertionState {
        self.state.borrow().clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AssertionState> {
        self.state.subscribe()
    }

    /// Run the ceremony for `username`.
    #[instrument(skip(self))]
    pub async fn run(&self, username: &str) -> Result<TokenSet> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == AssertionState::Idle {
                *state = AssertionState::CheckingEligibility;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(ceremony::already_used("assertion"));
        }

        match self.drive(username).await {
            Ok(tokens) => {
                self.state.send_replace(AssertionState::Complete);
                info!("Signed in with passkey");
                Ok(tokens)
            }
            Err(e) => {
                let reason = FailureReason::from(&e);
                warn!(%reason, error = %e, "Passkey login failed");
                self.state.send_replace(AssertionState::Failed(reason));
                Err(e)
            }
        }
    }

    async fn drive(&self, username: &str) -> Result<TokenSet> {
        let endpoints = &self.client.config().endpoints;
        let request = UsernameRequest { username };

        if !passkey_enabled(&self.client, &endpoints.passkey_check, username).await? {
            return Err(CeremonyError::NotEnabled.into());
        }

        self.state.send_replace(AssertionState::Starting);
        let start: ApiResponse<LoginStartData> =
            self.client.post(&endpoints.login_start, &request).await?;
        let challenge = start.data.unwrap_or_default().into_challenge()?;
        debug!(assertion_id = %challenge.assertion_id, "Assertion challenge received");

        self.state.send_replace(AssertionState::AwaitingAuthenticator);
        let credential = self
            .provider
            .get(challenge.request_options())
            .await
            .map_err(ceremony::authenticator_error)?;

        self.state.send_replace(AssertionState::Verifying);
        let body = PasskeyLoginRequest {
            auth_type: "passkey",
            assertion_id: &challenge.assertion_id,
            credential: AssertionCredentialJson::from(credential),
        };
        let verified: ApiResponse<TokenGrant> = self.client.post(&endpoints.login, &body).await?;

        let update = verified
            .data
            .map(TokenGrant::into_update)
            .filter(|u| u.access_token.is_some() && u.refresh_token.is_some())
            .ok_or_else(|| CeremonyError::Rejected {
                message: verified
                    .msg
                    .unwrap_or_else(|| "login response carried no tokens".to_string()),
            })?;

        let store = self.client.store();
        store.write(update).await?;
        store.read().await?.ok_or_else(|| {
            CeremonyError::Rejected {
                message: "session was not stored".to_string(),
            }
            .into()
        })
    }
}

/// Ask the backend whether `username` may sign in with a passkey.
///
/// The backend answers with `data: 1` (or `true`) when enabled.
pub async fn passkey_enabled(client: &RequestClient, path: &str, username: &str) -> Result<bool> {
    let response: ApiResponse<Value> = client.post(path, &UsernameRequest { username }).await?;
    Ok(is_enabled(response.data.as_ref()))
}

fn is_enabled(data: Option<&Value>) -> bool {
    match data {
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

impl fmt::Debug for AssertionCeremony {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionCeremony")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
