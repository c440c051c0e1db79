//! JSON wire types for the passkey endpoints.
//!
//! Incoming challenge fields are all optional so a malformed challenge is
//! reported by name instead of as a deserialization failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use passage_core::codec;
use passage_core::error::CeremonyError;
use passage_core::types::{
    AssertionChallenge, AssertionCredential, AttestationCredential, CreationOptions,
    CredentialDescriptor, PubKeyCredParam, RegistrationChallenge, RelyingParty, UserEntity,
};

// ============================================================================
// Registration
// ============================================================================

/// `data` of the register-start response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStartData {
    #[serde(default)]
    pub registration_id: Option<String>,
    #[serde(default)]
    pub public_key_credential_creation_options: Option<CreationOptionsJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOptionsJson {
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub rp: Option<RelyingPartyJson>,
    #[serde(default)]
    pub user: Option<UserJson>,
    #[serde(default)]
    pub pub_key_cred_params: Vec<PubKeyCredParamJson>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub exclude_credentials: Vec<DescriptorJson>,
    #[serde(default)]
    pub authenticator_selection: Option<Value>,
    #[serde(default)]
    pub attestation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelyingPartyJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJson {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PubKeyCredParamJson {
    pub alg: i64,
    #[serde(rename = "type", default = "public_key")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct DescriptorJson {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default = "public_key")]
    pub kind: String,
    #[serde(default)]
    pub transports: Vec<String>,
}

fn public_key() -> String {
    "public-key".to_string()
}

fn required(value: Option<String>, field: &'static str) -> Result<String, CeremonyError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CeremonyError::missing(field))
}

fn decode_field(value: &str, field: &'static str) -> Result<Vec<u8>, CeremonyError> {
    codec::decode(value).map_err(|e| CeremonyError::InvalidChallenge {
        field,
        reason: e.to_string(),
    })
}

impl RegistrationStartData {
    /// Validate and decode into a [`RegistrationChallenge`].
    pub fn into_challenge(self) -> Result<RegistrationChallenge, CeremonyError> {
        let registration_id = required(self.registration_id, "registrationId")?;
        let options = self
            .public_key_credential_creation_options
            .unwrap_or_default();
        let challenge = required(options.challenge, "challenge")?;
        let user = options.user.unwrap_or_default();
        let user_id = required(user.id, "user.id")?;

        let exclude_credentials = options
            .exclude_credentials
            .into_iter()
            .map(|d| {
                let id = required(d.id, "excludeCredentials.id")?;
                Ok(CredentialDescriptor {
                    id: decode_field(&id, "excludeCredentials.id")?,
                    kind: d.kind,
                    transports: d.transports,
                })
            })
            .collect::<Result<Vec<_>, CeremonyError>>()?;

        let rp = options.rp.unwrap_or_default();

        Ok(RegistrationChallenge {
            registration_id,
            options: CreationOptions {
                rp: RelyingParty {
                    name: rp.name,
                    id: rp.id,
                },
                user: UserEntity {
                    id: decode_field(&user_id, "user.id")?,
                    name: user.name,
                    display_name: user.display_name,
                },
                challenge: decode_field(&challenge, "challenge")?,
                pub_key_cred_params: options
                    .pub_key_cred_params
                    .into_iter()
                    .map(|p| PubKeyCredParam {
                        alg: p.alg,
                        kind: p.kind,
                    })
                    .collect(),
                timeout: options.timeout,
                exclude_credentials,
                authenticator_selection: options.authenticator_selection,
                attestation: options.attestation,
            },
        })
    }
}

/// Body of the register-finish call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFinishRequest<'a> {
    pub registration_id: &'a str,
    pub credential: AttestationCredentialJson,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationCredentialJson {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub raw_id: String,
    pub response: AttestationResponseJson,
    pub client_extension_results: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponseJson {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

impl From<AttestationCredential> for AttestationCredentialJson {
    fn from(credential: AttestationCredential) -> Self {
        let raw_id = codec::encode(&credential.raw_id);
        Self {
            kind: credential.kind,
            id: raw_id.clone(),
            raw_id,
            response: AttestationResponseJson {
                client_data_json: codec::encode(&credential.response.client_data_json),
                attestation_object: codec::encode(&credential.response.attestation_object),
                transports: credential.response.transports,
            },
            client_extension_results: extension_results(credential.client_extension_results),
        }
    }
}

fn extension_results(value: Value) -> Value {
    if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Body of the passkey-check and login-start calls.
#[derive(Debug, Serialize)]
pub struct UsernameRequest<'a> {
    pub username: &'a str,
}

/// `data` of the login-start response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginStartData {
    #[serde(default)]
    pub assertion_id: Option<String>,
    #[serde(default)]
    pub credential_id: Option<String>,
    #[serde(default)]
    pub public_key_credential_request_options: Option<RequestOptionsJson>,
    #[serde(default)]
    pub assertion_request: Option<AssertionRequestJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptionsJson {
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub rp_id: Option<String>,
    #[serde(default)]
    pub user_verification: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionRequestJson {
    #[serde(default)]
    pub user_handle: Option<String>,
}

impl LoginStartData {
    /// Validate and decode into an [`AssertionChallenge`].
    pub fn into_challenge(self) -> Result<AssertionChallenge, CeremonyError> {
        let assertion_id = required(self.assertion_id, "assertionId")?;
        let credential_id = required(self.credential_id, "credentialId")?;
        let options = self
            .public_key_credential_request_options
            .unwrap_or_default();
        let challenge = required(options.challenge, "challenge")?;

        let user_handle = self
            .assertion_request
            .and_then(|r| r.user_handle)
            .filter(|h| !h.is_empty())
            .map(|h| decode_field(&h, "userHandle"))
            .transpose()?;

        Ok(AssertionChallenge {
            assertion_id,
            credential_id: decode_field(&credential_id, "credentialId")?,
            challenge: decode_field(&challenge, "challenge")?,
            user_handle,
            timeout: options.timeout,
            rp_id: options.rp_id,
            user_verification: options.user_verification,
        })
    }
}

/// Body of the passkey login call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyLoginRequest<'a> {
    pub auth_type: &'static str,
    pub assertion_id: &'a str,
    pub credential: AssertionCredentialJson,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionCredentialJson {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub raw_id: String,
    pub response: AssertionResponseJson,
    pub client_extension_results: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponseJson {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

impl From<AssertionCredential> for AssertionCredentialJson {
    fn from(credential: AssertionCredential) -> Self {
        let raw_id = codec::encode(&credential.raw_id);
        Self {
            kind: credential.kind,
            id: raw_id.clone(),
            raw_id,
            response: AssertionResponseJson {
                client_data_json: codec::encode(&credential.response.client_data_json),
                authenticator_data: codec::encode(&credential.response.authenticator_data),
                signature: codec::encode(&credential.response.signature),
                user_handle: credential
                    .response
                    .user_handle
                    .as_deref()
                    .map(codec::encode),
            },
            client_extension_results: extension_results(credential.client_extension_results),
        }
    }
}
