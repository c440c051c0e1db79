//! passage-core - Core types, ports and codec for the passage toolkit.
//!
//! Everything here is free of network I/O: the session store, the base64url
//! codec, the passkey challenge and credential types, and the two ports
//! ([`ClientStorage`], [`CredentialProvider`]) that isolate the platform.

pub mod codec;
pub mod config;
pub mod error;
pub mod store;
pub mod tokens;
pub mod traits;
pub mod types;

pub use config::{ClientConfig, Endpoints, RELAY_PATH};
pub use error::Error;
pub use store::{MemoryStorage, SessionKeys, SessionStore};
pub use tokens::{AccessToken, RefreshToken, TokenGrant, TokenSet, TokenUpdate};
pub use traits::{AuthenticatorError, ClientStorage, CredentialProvider};
pub use types::{
    AssertionChallenge, AssertionCredential, AttestationCredential, BaseUrl,
    RegistrationChallenge, SessionState,
};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
