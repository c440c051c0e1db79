//! Platform credential API trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{AssertionCredential, AttestationCredential, CreationOptions, RequestOptions};

/// Failure reported by the platform authenticator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthenticatorError {
    /// The user dismissed the prompt, or the prompt timed out.
    #[error("the authenticator prompt was dismissed")]
    Cancelled,

    /// Any other platform failure.
    #[error("{name}: {message}")]
    Failed { name: String, message: String },
}

impl AuthenticatorError {
    /// Classify a DOM exception raised by `navigator.credentials`.
    ///
    /// Browsers report a dismissed prompt (and an expired one) as
    /// `NotAllowedError`, and an aborted call as `AbortError`.
    pub fn from_dom_exception(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "AbortError" => AuthenticatorError::Cancelled,
            _ => AuthenticatorError::Failed {
                name: name.to_string(),
                message: message.to_string(),
            },
        }
    }
}

/// The platform's credential API (`navigator.credentials` in a browser).
///
/// Both calls block on the user for an unbounded time.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Create a new credential.
    async fn create(
        &self,
        options: CreationOptions,
    ) -> Result<AttestationCredential, AuthenticatorError>;

    /// Produce an assertion with an existing credential.
    async fn get(&self, options: RequestOptions) -> Result<AssertionCredential, AuthenticatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_exceptions_map_to_cancelled() {
        assert_eq!(
            AuthenticatorError::from_dom_exception("NotAllowedError", "denied"),
            AuthenticatorError::Cancelled
        );
        assert_eq!(
            AuthenticatorError::from_dom_exception("AbortError", "aborted"),
            AuthenticatorError::Cancelled
        );
        assert!(matches!(
            AuthenticatorError::from_dom_exception("InvalidStateError", "already registered"),
            AuthenticatorError::Failed { .. }
        ));
    }
}
