//! Token types for bearer sessions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Token type assumed when the backend or storage does not say otherwise.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// An access token for authenticated requests.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; do not parse or inspect
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in authorization headers.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Hide token value in Debug output
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// A refresh token for obtaining new access tokens.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; do not parse or inspect
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl RefreshToken {
    /// Create a new refresh token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token value for use in refresh requests.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Hide token value in Debug output
impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken").field(&"[REDACTED]").finish()
    }
}

/// A complete session token set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub token_type: String,
}

impl TokenSet {
    /// Create a token set. The token type is trimmed.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        token_type: impl AsRef<str>,
    ) -> Self {
        Self {
            access_token: AccessToken::new(access_token),
            refresh_token: RefreshToken::new(refresh_token),
            token_type: token_type.as_ref().trim().to_string(),
        }
    }

    /// The `Authorization` header value for this token set.
    pub fn authorization(&self) -> String {
        authorization_value(&self.token_type, self.access_token.as_str())
    }
}

/// Build an `Authorization` value from a token type and an access token.
///
/// An empty token type falls back to [`DEFAULT_TOKEN_TYPE`].
pub fn authorization_value(token_type: &str, access_token: &str) -> String {
    let token_type = token_type.trim();
    let token_type = if token_type.is_empty() {
        DEFAULT_TOKEN_TYPE
    } else {
        token_type
    };
    format!("{} {}", token_type, access_token)
}

/// A partial token set. Absent fields leave the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenUpdate {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
    pub token_type: Option<String>,
}

impl TokenUpdate {
    /// Returns true if the update carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.token_type.is_none()
    }
}

impl From<TokenSet> for TokenUpdate {
    fn from(tokens: TokenSet) -> Self {
        Self {
            access_token: Some(tokens.access_token),
            refresh_token: Some(tokens.refresh_token),
            token_type: Some(tokens.token_type),
        }
    }
}

/// Token payload as issued by the backend (`access_token`, `refresh_token`,
/// `token_type`). Any field may be omitted when unchanged.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TokenGrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl TokenGrant {
    /// Convert to a store update, trimming the token type and dropping empty values.
    pub fn into_update(self) -> TokenUpdate {
        let non_empty = |s: String| if s.trim().is_empty() { None } else { Some(s) };
        TokenUpdate {
            access_token: self.access_token.and_then(non_empty).map(AccessToken::new),
            refresh_token: self.refresh_token.and_then(non_empty).map(RefreshToken::new),
            token_type: self
                .token_type
                .map(|t| t.trim().to_string())
                .and_then(non_empty),
        }
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_hides_value_in_debug() {
        let token = AccessToken::new("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("eyJ"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn refresh_token_hides_value_in_debug() {
        let token = RefreshToken::new("refresh_token_value_here");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("refresh_token_value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn authorization_joins_type_and_token() {
        let tokens = TokenSet::new("abc", "def", " Bearer ");
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.authorization(), "Bearer abc");
        assert_eq!(authorization_value("", "abc"), "Bearer abc");
    }

    #[test]
    fn grant_trims_token_type_and_keeps_missing_fields_absent() {
        let grant = TokenGrant {
            access_token: Some("new-access".into()),
            refresh_token: None,
            token_type: Some("Bearer \n".into()),
        };
        let update = grant.into_update();
        assert_eq!(update.access_token, Some(AccessToken::new("new-access")));
        assert!(update.refresh_token.is_none());
        assert_eq!(update.token_type.as_deref(), Some("Bearer"));
    }
}
