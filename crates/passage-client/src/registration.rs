//! Passkey registration ceremony.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use passage_core::codec;
use passage_core::{CredentialProvider, Result};

use crate::RequestClient;
use crate::ceremony::{self, FailureReason};
use crate::envelope::ApiResponse;
use crate::wire::{AttestationCredentialJson, RegistrationFinishRequest, RegistrationStartData};

/// Where a registration ceremony currently is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    Idle,
    Starting,
    AwaitingAuthenticator,
    Finishing,
    Complete,
    Failed(FailureReason),
}

/// Proof of account ownership sent to register-start.
#[derive(Clone, Serialize)]
#[serde(untagged)]
pub enum VerificationProof {
    /// An emailed one-time code.
    EmailCode { email: String, code: String },
    /// Any other backend-defined proof, sent as is.
    Custom(Value),
}

impl fmt::Debug for VerificationProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationProof::EmailCode { email, .. } => f
                .debug_struct("EmailCode")
                .field("email", email)
                .field("code", &"[REDACTED]")
                .finish(),
            VerificationProof::Custom(_) => f.write_str("Custom([REDACTED])"),
        }
    }
}

/// What a completed registration produced.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationOutcome {
    pub registration_id: String,
    /// base64url of the new credential's raw id.
    pub credential_id: String,
    /// The finish endpoint's `data`, if any.
    pub data: Value,
}

/// Creates a passkey for an account that has proven ownership.
///
/// A ceremony is single-use: [`run`](Self::run) succeeds at most once and a
/// second call is rejected. Progress can be observed with
/// [`subscribe`](Self::subscribe).
pub struct RegistrationCeremony {
    client: RequestClient,
    provider: Arc<dyn CredentialProvider>,
    state: watch::Sender<RegistrationState>,
}

impl RegistrationCeremony {
    pub fn new(client: RequestClient, provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client,
            provider,
            state: watch::Sender::new(RegistrationState::Idle),
        }
    }

    /// The current state.
    pub fn state(&self) -> RegistrationState {
        self.state.borrow().clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state.subscribe()
    }

    /// Run the ceremony to completion.
    ///
    /// # Errors
    ///
    /// Any failure leaves the ceremony in `Failed` with the matching
    /// [`FailureReason`] and is returned. A dismissed prompt is
    /// [`CeremonyError::Cancelled`](passage_core::error::CeremonyError::Cancelled).
    #[instrument(skip(self, proof))]
    pub async fn run(&self, proof: &VerificationProof) -> Result<RegistrationOutcome> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == RegistrationState::Idle {
                *state = RegistrationState::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(ceremony::already_used("registration"));
        }

        match self.drive(proof).await {
            Ok(outcome) => {
                self.state.send_replace(RegistrationState::Complete);
                info!(credential_id = %outcome.credential_id, "Passkey registered");
                Ok(outcome)
            }
            Err(e) => {
                let reason = FailureReason::from(&e);
                warn!(%reason, error = %e, "Passkey registration failed");
                self.state.send_replace(RegistrationState::Failed(reason));
                Err(e)
            }
        }
    }

    async fn drive(&self, proof: &VerificationProof) -> Result<RegistrationOutcome> {
        let endpoints = &self.client.config().endpoints;

        let start: ApiResponse<RegistrationStartData> =
            self.client.post(&endpoints.register_start, proof).await?;
        let challenge = start.data.unwrap_or_default().into_challenge()?;
        debug!(registration_id = %challenge.registration_id, "Registration challenge received");

        self.state
            .send_replace(RegistrationState::AwaitingAuthenticator);
        let credential = self
            .provider
            .create(challenge.options)
            .await
            .map_err(ceremony::authenticator_error)?;

        self.state.send_replace(RegistrationState::Finishing);
        let credential_id = codec::encode(&credential.raw_id);
        let body = RegistrationFinishRequest {
            registration_id: &challenge.registration_id,
            credential: AttestationCredentialJson::from(credential),
        };
        let finish: ApiResponse<Value> =
            self.client.post(&endpoints.register_finish, &body).await?;

        Ok(RegistrationOutcome {
            registration_id: challenge.registration_id,
            credential_id,
            data: finish.data.unwrap_or(Value::Null),
        })
    }
}

impl fmt::Debug for RegistrationCeremony {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationCeremony")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_proof_serializes_flat() {
        let proof = VerificationProof::EmailCode {
            email: "a@example.com".into(),
            code: "123456".into(),
        };
        assert_eq!(
            serde_json::to_value(&proof).unwrap(),
            json!({"email": "a@example.com", "code": "123456"})
        );
        assert!(!format!("{proof:?}").contains("123456"));
    }
}
