//! Relay error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// A request the relay refused or could not complete.
///
/// Renders as `{code, msg}` with `code` equal to the HTTP status.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Missing url in payload.")]
    MissingUrl,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Target origin not allowed.")]
    OriginNotAllowed,

    #[error("Upstream request failed.")]
    Upstream(#[source] reqwest::Error),

    #[error("Upstream refused the refresh.")]
    RefreshFailed,

    #[error("No session.")]
    Unauthorized,

    #[error("Refresh endpoint is not configured.")]
    NotConfigured,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::OriginNotAllowed => StatusCode::FORBIDDEN,
            Self::Upstream(_) | Self::RefreshFailed => StatusCode::BAD_GATEWAY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Upstream(ref e) = self {
            warn!(error = %e, "Upstream request failed");
        }
        let body = json!({ "code": status.as_u16(), "msg": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Invalid relay configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
