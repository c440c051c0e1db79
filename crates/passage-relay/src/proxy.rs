//! `POST /api/proxy`: forward a described request to the backend.

use std::collections::BTreeMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::error::RelayError;
use crate::session;
use crate::state::RelayState;

/// Headers never forwarded upstream.
pub const STRIPPED_HEADERS: [&str; 5] = [
    "host",
    "connection",
    "content-length",
    "accept-encoding",
    "transfer-encoding",
];

/// Body of a relay call.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyPayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[instrument(skip_all)]
pub async fn proxy(
    State(state): State<RelayState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<Response, RelayError> {
    let payload: ProxyPayload = if body.is_empty() {
        ProxyPayload::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| RelayError::InvalidPayload(e.to_string()))?
    };

    let target = payload
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(RelayError::MissingUrl)?;
    let target = url::Url::parse(target).map_err(|e| RelayError::InvalidPayload(e.to_string()))?;
    if !matches!(target.scheme(), "http" | "https") {
        return Err(RelayError::InvalidPayload(format!(
            "unsupported scheme '{}'",
            target.scheme()
        )));
    }
    let origin = target.origin().ascii_serialization();
    if !state.config.origin_allowed(&origin) {
        warn!(%origin, "Blocked relay target");
        return Err(RelayError::OriginNotAllowed);
    }

    let method = parse_method(payload.method.as_deref())?;
    let mut headers = sanitize_headers(&payload.headers);
    let is_get = method == Method::GET || method == Method::HEAD;

    if !is_get && !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }

    if !headers.contains_key(header::AUTHORIZATION)
        && state.config.credentials_allowed(&origin)
        && let Some(authorization) = session::authorization_from(&jar, state.keys)
    {
        match HeaderValue::from_str(&authorization) {
            Ok(value) => {
                headers.insert(header::AUTHORIZATION, value);
            }
            Err(_) => warn!("Session cookie is not a valid header value, not attaching"),
        }
    }

    debug!(%method, url = %target, "Forwarding");

    let mut request = state.http.request(method, target).headers(headers);
    if !is_get && let Some(data) = &payload.data {
        let bytes =
            serde_json::to_vec(data).map_err(|e| RelayError::InvalidPayload(e.to_string()))?;
        request = request.body(bytes);
    }

    let response = request.send().await.map_err(RelayError::Upstream)?;
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    let bytes = response.bytes().await.map_err(RelayError::Upstream)?;

    debug!(status = status.as_u16(), is_json, "Upstream responded");

    if is_json {
        Ok((
            status,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response())
    } else {
        let text = String::from_utf8_lossy(&bytes);
        Ok((
            status,
            Json(json!({
                "msg": "Non-JSON response",
                "data": text,
                "status": status.as_u16(),
            })),
        )
            .into_response())
    }
}

fn parse_method(method: Option<&str>) -> Result<Method, RelayError> {
    let Some(method) = method.map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(Method::GET);
    };
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| RelayError::InvalidPayload(format!("invalid method '{method}'")))
}

/// Drop hop-by-hop and transport headers, and anything that is not a valid
/// header.
pub fn sanitize_headers(headers: &BTreeMap<String, String>) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if STRIPPED_HEADERS
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name.trim()))
        {
            continue;
        }
        match (
            HeaderName::from_bytes(name.trim().as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                out.insert(name, value);
            }
            _ => debug!(header = %name, "Dropping invalid header"),
        }
    }
    out
}
