//! Relay-routed request client with one refresh-and-retry cycle.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use passage_core::error::{AuthError, Error, InvalidInputError};
use passage_core::{ClientConfig, Result, SessionState, SessionStore};

use crate::envelope::{self, Outcome};
use crate::refresh::RefreshCoordinator;
use crate::relay::{Headers, RelayPayload, RelayTransport};

/// How many times a request may be replayed after a refresh.
pub const MAX_AUTH_RETRIES: u8 = 1;

/// Sends every call through the relay, attaching session credentials.
///
/// On HTTP 401 the client asks the [`RefreshCoordinator`] to renew the
/// session and replays the call at most [`MAX_AUTH_RETRIES`] times. Cheap
/// to clone.
#[derive(Clone)]
pub struct RequestClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: RelayTransport,
    store: SessionStore,
    refresher: RefreshCoordinator,
    refresh_url: String,
}

impl RequestClient {
    /// Create a client for the given configuration and session store.
    pub fn new(config: ClientConfig, store: SessionStore) -> Result<Self> {
        let transport = RelayTransport::new(config.relay_url())?;
        let refresh_url = config.api_base.join(&config.endpoints.refresh);
        let refresher =
            RefreshCoordinator::new(transport.clone(), store.clone(), refresh_url.clone());

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                store,
                refresher,
                refresh_url,
            }),
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the session store.
    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// Returns the refresh coordinator shared by this client's calls.
    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.inner.refresher
    }

    /// Derive the current session state.
    pub async fn session_state(&self) -> Result<SessionState> {
        self.inner.refresher.session_state().await
    }

    /// Clear the stored session.
    pub async fn logout(&self) -> Result<()> {
        debug!("Logging out");
        self.inner.store.clear().await
    }

    /// `GET path`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(path, Method::GET, None, None).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let data = to_json(body)?;
        self.request(path, Method::POST, None, Some(data)).await
    }

    /// Perform a call and decode the response body as `T`.
    ///
    /// `path` is resolved against the API base unless it is already an
    /// absolute URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] for non-2xx responses
    /// - [`Error::Application`] when the envelope reports a numeric code other than 200
    /// - [`AuthError::SessionExpired`] when a 401 could not be cured by a refresh
    /// - [`Error::Transport`] when the relay is unreachable
    #[instrument(skip(self, headers, body))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        method: Method,
        headers: Option<Headers>,
        body: Option<Value>,
    ) -> Result<T> {
        let url = self.inner.config.api_base.join(path);
        let may_refresh = url != self.inner.refresh_url;
        let mut retries_left = MAX_AUTH_RETRIES;

        loop {
            let (payload, sent_auth) = self
                .build_payload(&url, &method, headers.as_ref(), body.as_ref())
                .await?;

            let reply = self.inner.transport.forward(&payload).await?;

            match envelope::decode(reply)? {
                Outcome::Success(value) => {
                    return serde_json::from_value(value).map_err(|e| {
                        InvalidInputError::Response {
                            reason: e.to_string(),
                        }
                        .into()
                    });
                }
                Outcome::Application(e) => return Err(e.into()),
                Outcome::Http(e) if e.is_unauthorized() && may_refresh && retries_left > 0 => {
                    retries_left -= 1;
                    debug!("Unauthorized, attempting session renewal");
                    if self.renew(sent_auth.as_deref()).await? {
                        continue;
                    }
                    return Err(AuthError::SessionExpired.into());
                }
                Outcome::Http(e) => return Err(e.into()),
            }
        }
    }

    /// Like [`request`](Self::request), aborting when `cancel` fires.
    pub async fn request_with_cancel<T: DeserializeOwned>(
        &self,
        path: &str,
        method: Method,
        headers: Option<Headers>,
        body: Option<Value>,
        cancel: &CancellationToken,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(path, "Request cancelled by caller");
                Err(Error::Cancelled)
            }
            result = self.request(path, method, headers, body) => result,
        }
    }

    /// Fire a call whose failure does not matter to the caller (e.g. marking
    /// notifications read). Failures are logged, never returned.
    pub async fn request_best_effort(&self, path: &str, method: Method, body: Option<Value>) {
        if let Err(e) = self.request::<Value>(path, method, None, body).await {
            warn!(path, error = %e, "Best-effort request failed");
        }
    }

    /// Build the relay payload. Also returns the `Authorization` value taken
    /// from the session store, if one was attached.
    async fn build_payload(
        &self,
        url: &str,
        method: &Method,
        headers: Option<&Headers>,
        body: Option<&Value>,
    ) -> Result<(RelayPayload, Option<String>)> {
        let mut payload = RelayPayload::new(url, method).with_data(body.cloned());
        if let Some(headers) = headers {
            payload.headers.extend(headers.clone());
        }
        payload.default_header("Content-Type", "application/json");

        let mut attached = None;
        if payload.header("Authorization").is_none()
            && let Some(authorization) = self.inner.store.authorization().await?
        {
            payload
                .headers
                .insert("Authorization".to_string(), authorization.clone());
            attached = Some(authorization);
        }

        Ok((payload, attached))
    }

    /// Decide whether a 401'd call is worth replaying.
    ///
    /// If the stored credentials changed since the call was sent, another
    /// caller already renewed them and the call is replayed as is.
    async fn renew(&self, sent_auth: Option<&str>) -> Result<bool> {
        let current = self.inner.store.authorization().await?;
        match (sent_auth, current.as_deref()) {
            (Some(sent), Some(current)) if sent != current => {
                debug!("Credentials already renewed, replaying");
                Ok(true)
            }
            (Some(_), None) => {
                debug!("Session was cleared while the request was in flight");
                Ok(false)
            }
            _ => Ok(self.inner.refresher.refresh().await),
        }
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| {
        InvalidInputError::Other {
            message: e.to_string(),
        }
        .into()
    })
}

impl fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient")
            .field("relay", &self.inner.transport.relay_url())
            .field("api_base", &self.inner.config.api_base)
            .finish()
    }
}
