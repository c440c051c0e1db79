//! Ports to the platform: session persistence and the native credential API.

mod credentials;
mod storage;

pub use credentials::{AuthenticatorError, CredentialProvider};
pub use storage::ClientStorage;
