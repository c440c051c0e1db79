//! Error types for passage.
//!
//! One error type covers the whole session and ceremony lifecycle, with
//! explicit variants so callers can tell a transport failure from an HTTP
//! error, an application-level rejection, an expired session, or a passkey
//! ceremony that the user cancelled.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// The unified error type for passage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout, relay unreachable).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Non-2xx HTTP response from the relay or the backend behind it.
    #[error("{0}")]
    Http(#[from] HttpError),

    /// 2xx response whose envelope carries a numeric `code` other than 200.
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Session errors (no session, refresh failed).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Passkey ceremony errors.
    #[error("ceremony error: {0}")]
    Ceremony(#[from] CeremonyError),

    /// Input validation errors (URLs, base64url, response shapes).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// The session storage port failed.
    #[error("storage error: {message}")]
    Storage { message: String },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true if this error means the caller must sign in again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Auth(AuthError::SessionExpired))
    }

    /// Returns true if this error is a user-cancelled passkey prompt.
    pub fn is_ceremony_cancelled(&self) -> bool {
        matches!(self, Error::Ceremony(CeremonyError::Cancelled))
    }

    /// Create a storage error from any displayable cause.
    pub fn storage(cause: impl fmt::Display) -> Self {
        Error::Storage {
            message: cause.to_string(),
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Response body could not be read or decoded.
    #[error("malformed response: {message}")]
    Decode { message: String },

    /// Generic request failure.
    #[error("request failed: {message}")]
    Http { message: String },
}

/// A non-2xx HTTP response.
#[derive(Debug)]
pub struct HttpError {
    /// HTTP status code.
    pub status: u16,
    /// Message safe to show to a user.
    pub message: String,
    /// Raw response body text.
    pub body: String,
}

impl HttpError {
    /// Build an HTTP error, deriving a display message from the body.
    ///
    /// A JSON `msg` or `message` field is used when present. HTML and empty
    /// bodies are replaced by a generic status message so markup never reaches
    /// the UI.
    pub fn from_body(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = message_from_body(&body).unwrap_or_else(|| generic_message(status));
        Self {
            status,
            message,
            body,
        }
    }

    /// Check if this is an authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

fn generic_message(status: u16) -> String {
    format!("request failed with status {status}")
}

fn message_from_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() || looks_like_html(trimmed) {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return ["msg", "message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    Some(trimmed.chars().take(200).collect())
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.chars().take(64).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html") || head.contains("<body")
}

/// An application-level failure reported inside a successful HTTP response.
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /// Envelope `code`.
    pub code: i64,
    /// Envelope `msg`, if any.
    pub msg: Option<String>,
    /// Envelope `data`, for field-specific UI messages.
    pub data: Value,
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "application error {}", self.code)?;
        if let Some(ref msg) = self.msg {
            write!(f, ": {}", msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApplicationError {}

impl ApplicationError {
    /// Check if the backend reported an authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        self.code == 401
    }
}

/// Session-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The request was rejected and the session could not be renewed.
    #[error("session expired")]
    SessionExpired,

    /// No session is stored.
    #[error("not authenticated")]
    NotAuthenticated,
}

/// Passkey ceremony errors.
#[derive(Debug, Error)]
pub enum CeremonyError {
    /// The server challenge is incomplete or malformed.
    #[error("invalid challenge: {field} {reason}")]
    InvalidChallenge { field: &'static str, reason: String },

    /// The user dismissed the authenticator prompt.
    #[error("cancelled by user")]
    Cancelled,

    /// The platform authenticator failed.
    #[error("authenticator failed: {message}")]
    Authenticator { message: String },

    /// Passkey login is not enabled for the account.
    #[error("passkey login is not enabled for this account")]
    NotEnabled,

    /// The server did not accept the ceremony result.
    #[error("rejected: {message}")]
    Rejected { message: String },
}

impl CeremonyError {
    /// Shorthand for a missing challenge field.
    pub fn missing(field: &'static str) -> Self {
        CeremonyError::InvalidChallenge {
            field,
            reason: "is missing".to_string(),
        }
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid base URL.
    #[error("invalid URL '{value}': {reason}")]
    Url { value: String, reason: String },

    /// Invalid base64url text.
    #[error("invalid base64url: {reason}")]
    Base64 { reason: String },

    /// A response did not have the expected shape.
    #[error("unexpected response: {reason}")]
    Response { reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
