//! HTTP transport to the same-origin relay.

use std::collections::BTreeMap;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use passage_core::error::{Error, TransportError};

/// Outbound request headers, keyed by name.
pub type Headers = BTreeMap<String, String>;

/// Body posted to the relay: where to forward, and what.
#[derive(Debug, Clone, Serialize)]
pub struct RelayPayload {
    pub url: String,
    pub method: String,
    pub headers: Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RelayPayload {
    /// Payload for `method url` with no headers.
    pub fn new(url: impl Into<String>, method: &Method) -> Self {
        Self {
            url: url.into(),
            method: method.as_str().to_string(),
            headers: Headers::new(),
            data: None,
        }
    }

    /// Attach a JSON body. Ignored by the relay for GET.
    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }

    /// Returns the header value for `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Set a header unless one with the same name (any case) is present.
    pub fn default_header(&mut self, name: &str, value: impl Into<String>) {
        if self.header(name).is_none() {
            self.headers.insert(name.to_string(), value.into());
        }
    }
}

/// Case-insensitive header lookup.
pub fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Raw reply from the relay.
#[derive(Debug, Clone)]
pub struct RelayReply {
    pub status: u16,
    pub body: String,
}

/// Posts [`RelayPayload`]s to the relay endpoint.
#[derive(Debug, Clone)]
pub struct RelayTransport {
    client: reqwest::Client,
    relay_url: String,
}

impl RelayTransport {
    /// Create a transport for the given relay endpoint URL.
    pub fn new(relay_url: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("passage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            relay_url: relay_url.into(),
        })
    }

    /// Returns the relay endpoint URL.
    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    /// Forward one call through the relay.
    #[instrument(skip(self, payload), fields(method = %payload.method, url = %payload.url))]
    pub async fn forward(&self, payload: &RelayPayload) -> Result<RelayReply, Error> {
        debug!("Relaying request");

        let response = self
            .client
            .post(&self.relay_url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        trace!(status, bytes = body.len(), "Relay response");

        Ok(RelayReply { status, body })
    }
}

/// Map a reqwest failure onto the transport error taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let err = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else if err.is_decode() || err.is_body() {
        TransportError::Decode {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(err)
}
