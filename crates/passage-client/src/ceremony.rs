//! Shared pieces of the two passkey ceremonies.

use std::fmt;

use passage_core::error::{CeremonyError, Error};
use passage_core::traits::AuthenticatorError;

/// Why a ceremony ended in its `Failed` state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The server challenge was missing a field or was not base64url.
    Validation,
    /// The user dismissed the authenticator prompt.
    Cancelled,
    /// The platform authenticator failed.
    Authenticator,
    /// Passkey login is not enabled for the account.
    NotEnabled,
    /// The server refused the ceremony result.
    Rejected,
    /// The relay or backend could not be reached.
    Network,
    /// The session expired and could not be renewed.
    SessionExpired,
    /// The session store failed.
    Storage,
}

impl From<&Error> for FailureReason {
    fn from(error: &Error) -> Self {
        match error {
            Error::Ceremony(CeremonyError::InvalidChallenge { .. }) => FailureReason::Validation,
            Error::Ceremony(CeremonyError::Cancelled) | Error::Cancelled => {
                FailureReason::Cancelled
            }
            Error::Ceremony(CeremonyError::Authenticator { .. }) => FailureReason::Authenticator,
            Error::Ceremony(CeremonyError::NotEnabled) => FailureReason::NotEnabled,
            Error::Ceremony(CeremonyError::Rejected { .. })
            | Error::Http(_)
            | Error::Application(_) => FailureReason::Rejected,
            Error::InvalidInput(_) => FailureReason::Validation,
            Error::Transport(_) => FailureReason::Network,
            Error::Auth(_) => FailureReason::SessionExpired,
            Error::Storage { .. } => FailureReason::Storage,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::Validation => "invalid challenge",
            FailureReason::Cancelled => "cancelled",
            FailureReason::Authenticator => "authenticator failure",
            FailureReason::NotEnabled => "passkey not enabled",
            FailureReason::Rejected => "rejected by server",
            FailureReason::Network => "network failure",
            FailureReason::SessionExpired => "session expired",
            FailureReason::Storage => "storage failure",
        };
        f.write_str(s)
    }
}

pub(crate) fn authenticator_error(error: AuthenticatorError) -> Error {
    match error {
        AuthenticatorError::Cancelled => CeremonyError::Cancelled.into(),
        other => CeremonyError::Authenticator {
            message: other.to_string(),
        }
        .into(),
    }
}

pub(crate) fn already_used(ceremony: &str) -> Error {
    passage_core::error::InvalidInputError::Other {
        message: format!("{ceremony} ceremony has already run"),
    }
    .into()
}
