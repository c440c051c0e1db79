//! Client configuration.

use crate::types::BaseUrl;

/// Path of the same-origin relay endpoint.
pub const RELAY_PATH: &str = "/api/proxy";

/// Backend paths used by the session and passkey flows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// Token refresh (`authType: "refreshToken"`).
    pub refresh: String,
    /// Passkey login verification (`authType: "passkey"`).
    pub login: String,
    pub register_start: String,
    pub register_finish: String,
    /// Whether an account has passkey login enabled.
    pub passkey_check: String,
    pub login_start: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            refresh: "/auth/login".to_string(),
            login: "/auth/login".to_string(),
            register_start: "/auth/passkey/register/start".to_string(),
            register_finish: "/auth/passkey/register/finish".to_string(),
            passkey_check: "/auth/passkey/check".to_string(),
            login_start: "/auth/passkey/login/start".to_string(),
        }
    }
}

/// Where the client sends its calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin serving the relay.
    pub app_origin: BaseUrl,
    /// Backend base that relative request paths resolve against.
    pub api_base: BaseUrl,
    pub endpoints: Endpoints,
}

impl ClientConfig {
    /// Configuration with default endpoints.
    pub fn new(app_origin: BaseUrl, api_base: BaseUrl) -> Self {
        Self {
            app_origin,
            api_base,
            endpoints: Endpoints::default(),
        }
    }

    /// Replace the endpoint paths.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Absolute URL of the relay endpoint.
    pub fn relay_url(&self) -> String {
        self.app_origin.join(RELAY_PATH)
    }
}
