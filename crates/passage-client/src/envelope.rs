//! Response envelope decoding.
//!
//! Relay replies are interpreted exactly once, here, into an [`Outcome`];
//! nothing downstream re-reads raw status codes or `code` fields.

use serde::Deserialize;
use serde_json::Value;

use passage_core::error::{ApplicationError, Error, HttpError, TransportError};

use crate::relay::RelayReply;

/// The backend's `{code, msg, data}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Numeric or string status code.
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Returns true if the envelope carries `code: 200` (number or string).
    pub fn is_ok(&self) -> bool {
        match &self.code {
            Some(Value::Number(n)) => n.as_i64() == Some(200),
            Some(Value::String(s)) => s.trim() == "200",
            _ => false,
        }
    }
}

/// A decoded relay reply.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// 2xx, and the envelope (if any) does not report a failure.
    Success(Value),
    /// 2xx, but the envelope reports a numeric `code` other than 200.
    Application(ApplicationError),
    /// Non-2xx.
    Http(HttpError),
}

pub(crate) fn decode(reply: RelayReply) -> Result<Outcome, Error> {
    if !(200..300).contains(&reply.status) {
        return Ok(Outcome::Http(HttpError::from_body(reply.status, reply.body)));
    }

    if reply.body.trim().is_empty() {
        return Ok(Outcome::Success(Value::Null));
    }

    let value: Value = serde_json::from_str(&reply.body).map_err(|e| {
        Error::Transport(TransportError::Decode {
            message: e.to_string(),
        })
    })?;

    if let Some(code) = value.get("code").and_then(Value::as_i64)
        && code != 200
    {
        return Ok(Outcome::Application(ApplicationError {
            code,
            msg: value.get("msg").and_then(Value::as_str).map(str::to_string),
            data: value.get("data").cloned().unwrap_or(Value::Null),
        }));
    }

    Ok(Outcome::Success(value))
}
