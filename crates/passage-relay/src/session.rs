//! Cookie-held sessions: set, refresh and clear the three token cookies.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Serialize;
use serde_json::{Value, json};
use time::Duration;
use tracing::{debug, info, instrument, warn};

use passage_core::tokens::authorization_value;
use passage_core::{SessionKeys, TokenGrant, TokenUpdate};

use crate::error::RelayError;
use crate::state::RelayState;

/// `Authorization` value derived from the session cookies, if present.
pub fn authorization_from(jar: &CookieJar, keys: SessionKeys) -> Option<String> {
    let access = jar
        .get(keys.access_token)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())?;
    let token_type = jar
        .get(keys.token_type)
        .map(|c| c.value().to_string())
        .unwrap_or_default();
    Some(authorization_value(&token_type, &access))
}

fn session_cookie(name: &'static str, value: String, state: &RelayState) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(state.config.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(state.config.session_ttl_days))
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").max_age(Duration::ZERO).build()
}

/// Set a cookie for every field present in `update`.
fn store_tokens(mut jar: CookieJar, update: TokenUpdate, state: &RelayState) -> CookieJar {
    let keys = state.keys;
    if let Some(access) = update.access_token {
        jar = jar.add(session_cookie(
            keys.access_token,
            access.as_str().to_string(),
            state,
        ));
    }
    if let Some(refresh) = update.refresh_token {
        jar = jar.add(session_cookie(
            keys.refresh_token,
            refresh.as_str().to_string(),
            state,
        ));
    }
    if let Some(token_type) = update.token_type {
        jar = jar.add(session_cookie(keys.token_type, token_type, state));
    }
    jar
}

fn clear_tokens(mut jar: CookieJar, keys: SessionKeys) -> CookieJar {
    for name in keys.all() {
        jar = jar.add(removal_cookie(name));
    }
    jar
}

/// `POST /api/session`: persist a freshly issued token set.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<RelayState>,
    jar: CookieJar,
    Json(grant): Json<TokenGrant>,
) -> Result<(CookieJar, StatusCode), RelayError> {
    let update = grant.into_update();
    if update.access_token.is_none() || update.refresh_token.is_none() {
        return Err(RelayError::InvalidPayload(
            "access_token and refresh_token are required".to_string(),
        ));
    }
    debug!("Storing session cookies");
    Ok((store_tokens(jar, update, &state), StatusCode::NO_CONTENT))
}

/// `POST /api/session/logout`.
#[instrument(skip_all)]
pub async fn logout(State(state): State<RelayState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    debug!("Clearing session cookies");
    (clear_tokens(jar, state.keys), StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    auth_type: &'static str,
    refresh_token: &'a str,
}

/// `POST /api/session/refresh`: exchange the refresh cookie upstream.
///
/// An authorization failure clears the cookies and answers 401; any other
/// failure answers 502 and leaves them alone.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<RelayState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), (CookieJar, RelayError)> {
    let Some(refresh_token) = jar
        .get(state.keys.refresh_token)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Err((jar, RelayError::Unauthorized));
    };
    let Some(url) = state.config.refresh_url() else {
        return Err((jar, RelayError::NotConfigured));
    };

    info!("Refreshing cookie session");

    let response = match state
        .http
        .post(&url)
        .json(&RefreshRequest {
            auth_type: "refreshToken",
            refresh_token: &refresh_token,
        })
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return Err((jar, RelayError::Upstream(e))),
    };

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        info!("Refresh rejected with HTTP 401, clearing cookies");
        return Err((clear_tokens(jar, state.keys), RelayError::Unauthorized));
    }
    if !status.is_success() {
        warn!(status = status.as_u16(), "Refresh failed upstream");
        return Err((jar, RelayError::RefreshFailed));
    }

    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(e) => return Err((jar, RelayError::Upstream(e))),
    };

    match body.get("code").and_then(Value::as_i64) {
        Some(401) => {
            info!("Refresh rejected with code 401, clearing cookies");
            return Err((clear_tokens(jar, state.keys), RelayError::Unauthorized));
        }
        Some(200) => {}
        other => {
            warn!(code = ?other, "Refresh refused upstream");
            return Err((jar, RelayError::RefreshFailed));
        }
    }

    let update = body
        .get("data")
        .cloned()
        .and_then(|d| serde_json::from_value::<TokenGrant>(d).ok())
        .map(TokenGrant::into_update)
        .filter(|u| u.access_token.is_some());
    let Some(update) = update else {
        warn!("Refresh response carried no token data");
        return Err((jar, RelayError::RefreshFailed));
    };

    Ok((
        store_tokens(jar, update, &state),
        Json(json!({ "code": 200, "msg": "Session refreshed." })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_from_cookies() {
        let keys = SessionKeys::CANONICAL;
        let jar = CookieJar::new();
        assert!(authorization_from(&jar, keys).is_none());

        let jar = jar.add(Cookie::new(keys.access_token, "abc"));
        assert_eq!(authorization_from(&jar, keys).as_deref(), Some("Bearer abc"));

        let jar = jar.add(Cookie::new(keys.token_type, "DPoP"));
        assert_eq!(authorization_from(&jar, keys).as_deref(), Some("DPoP abc"));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal_cookie("passage_access_token");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.value(), "");
    }
}
