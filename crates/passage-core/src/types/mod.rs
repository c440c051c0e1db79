//! Core passage types.
//!
//! Binary fields are held as bytes here; the base64url wire form lives in
//! the client crate.

mod base_url;
mod challenge;
mod credential;
mod session_state;

pub use base_url::BaseUrl;
pub use challenge::{
    AssertionChallenge, CreationOptions, CredentialDescriptor, PubKeyCredParam,
    RegistrationChallenge, RelyingParty, RequestOptions, UserEntity,
};
pub use credential::{
    AssertionCredential, AssertionResponse, AttestationCredential, AttestationResponse,
};
pub use session_state::SessionState;
