//! Relay configuration.

use std::env;
use std::net::SocketAddr;

use passage_core::BaseUrl;

use crate::error::ConfigError;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// Default backend refresh path.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/login";

/// Settings for the relay server.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Backend base used by the cookie refresh handler. The proxy itself
    /// forwards to whatever absolute URL the payload names.
    pub api_base: Option<BaseUrl>,
    pub refresh_path: String,
    /// Set the `Secure` attribute on session cookies.
    pub secure_cookies: bool,
    /// Origins the proxy may forward to. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    pub session_ttl_days: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
            api_base: None,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            secure_cookies: true,
            allowed_origins: Vec::new(),
            session_ttl_days: 30,
        }
    }
}

impl RelayConfig {
    /// Read `PASSAGE_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(bind) = lookup("PASSAGE_RELAY_BIND") {
            config.bind = parse_bind(&bind)?;
        }
        if let Some(base) = lookup("PASSAGE_API_BASE").filter(|s| !s.trim().is_empty()) {
            config.api_base = Some(BaseUrl::new(base.trim()).map_err(|e| ConfigError::Invalid {
                key: "PASSAGE_API_BASE",
                reason: e.to_string(),
            })?);
        }
        if let Some(path) = lookup("PASSAGE_REFRESH_PATH").filter(|s| !s.trim().is_empty()) {
            config.refresh_path = path.trim().to_string();
        }
        if let Some(flag) = lookup("PASSAGE_SECURE_COOKIES") {
            config.secure_cookies = parse_flag(&flag)?;
        }
        if let Some(origins) = lookup("PASSAGE_ALLOWED_ORIGINS") {
            config.allowed_origins = parse_origins(&origins)?;
        }

        Ok(config)
    }

    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_api_base(mut self, api_base: BaseUrl) -> Self {
        self.api_base = Some(api_base);
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Restrict forwarding to the given origins.
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins
            .into_iter()
            .map(|o| o.into().trim_end_matches('/').to_string())
            .collect();
        self
    }

    /// Returns true if `origin` may be forwarded to.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == origin)
    }

    /// Returns true if session cookies may be attached to calls to `origin`:
    /// the backend origin or one listed explicitly.
    pub fn credentials_allowed(&self, origin: &str) -> bool {
        self.api_base.as_ref().is_some_and(|b| b.origin() == origin)
            || self.allowed_origins.iter().any(|o| o == origin)
    }

    /// Absolute backend refresh URL, if a backend base is configured.
    pub fn refresh_url(&self) -> Option<String> {
        self.api_base.as_ref().map(|b| b.join(&self.refresh_path))
    }
}

pub(crate) fn parse_bind(value: &str) -> Result<SocketAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: "PASSAGE_RELAY_BIND",
        reason: format!("'{value}' is not a socket address"),
    })
}

fn parse_flag(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key: "PASSAGE_SECURE_COOKIES",
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}

fn parse_origins(value: &str) -> Result<Vec<String>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            url::Url::parse(s)
                .map(|u| u.origin().ascii_serialization())
                .map_err(|e| ConfigError::Invalid {
                    key: "PASSAGE_ALLOWED_ORIGINS",
                    reason: format!("'{s}': {e}"),
                })
        })
        .collect()
}
