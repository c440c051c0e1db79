//! Server-issued passkey challenges, decoded for the platform authenticator.

use serde_json::Value;

/// Relying party information.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelyingParty {
    pub name: Option<String>,
    pub id: Option<String>,
}

/// The account a credential is being created for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserEntity {
    /// Opaque user handle.
    pub id: Vec<u8>,
    pub name: Option<String>,
    pub display_name: Option<String>,
}

/// An acceptable public key algorithm (COSE identifier).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PubKeyCredParam {
    pub alg: i64,
    pub kind: String,
}

/// A reference to an existing credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialDescriptor {
    pub id: Vec<u8>,
    pub kind: String,
    pub transports: Vec<String>,
}

impl CredentialDescriptor {
    /// A `public-key` descriptor with no transport hints.
    pub fn public_key(id: Vec<u8>) -> Self {
        Self {
            id,
            kind: "public-key".to_string(),
            transports: Vec::new(),
        }
    }
}

/// Options handed to the platform credential-creation API.
#[derive(Clone, Debug, PartialEq)]
pub struct CreationOptions {
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub challenge: Vec<u8>,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    /// Timeout hint in milliseconds, passed through untouched.
    pub timeout: Option<u64>,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: Option<Value>,
    pub attestation: Option<String>,
}

/// A single-use registration challenge.
///
/// `registration_id` must be echoed unmodified to the finish endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationChallenge {
    pub registration_id: String,
    pub options: CreationOptions,
}

/// Options handed to the platform credential-retrieval API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOptions {
    pub challenge: Vec<u8>,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub timeout: Option<u64>,
    pub rp_id: Option<String>,
    pub user_verification: Option<String>,
}

/// A single-use assertion (login) challenge.
///
/// `assertion_id` must be echoed unmodified to the login endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertionChallenge {
    pub assertion_id: String,
    pub credential_id: Vec<u8>,
    pub challenge: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
    pub timeout: Option<u64>,
    pub rp_id: Option<String>,
    pub user_verification: Option<String>,
}

impl AssertionChallenge {
    /// Retrieval options restricted to the one allowed credential.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            challenge: self.challenge.clone(),
            allow_credentials: vec![CredentialDescriptor::public_key(
                self.credential_id.clone(),
            )],
            timeout: self.timeout,
            rp_id: self.rp_id.clone(),
            user_verification: self.user_verification.clone(),
        }
    }
}
