//! Credentials returned by the platform authenticator.
//!
//! The core only reads these fields and forwards them; verifying the
//! cryptographic material is the backend's job.

use serde_json::Value;

/// Result of a credential-creation call.
#[derive(Clone, Debug, PartialEq)]
pub struct AttestationCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub kind: String,
    pub response: AttestationResponse,
    pub client_extension_results: Value,
}

/// Authenticator attestation response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationResponse {
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
    pub transports: Vec<String>,
}

/// Result of a credential-retrieval call.
#[derive(Clone, Debug, PartialEq)]
pub struct AssertionCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub kind: String,
    pub response: AssertionResponse,
    pub client_extension_results: Value,
}

/// Authenticator assertion response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertionResponse {
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}
