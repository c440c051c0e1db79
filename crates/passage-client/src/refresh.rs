//! Token refresh through the relay, shared by concurrent callers.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use passage_core::{Result, SessionState, SessionStore, TokenGrant};

use crate::envelope::{self, ApiResponse, Outcome};
use crate::relay::{RelayPayload, RelayTransport};

/// Request body for the refresh exchange.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    auth_type: &'static str,
    refresh_token: &'a str,
}

type InFlight = Shared<BoxFuture<'static, bool>>;

/// Exchanges the stored refresh token for a new token set.
///
/// Concurrent callers share one in-flight exchange and all observe its
/// result. Cheap to clone.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

struct RefreshInner {
    transport: RelayTransport,
    store: SessionStore,
    refresh_url: String,
    in_flight: Mutex<Option<InFlight>>,
}

impl RefreshCoordinator {
    /// Create a coordinator posting to `refresh_url` through `transport`.
    pub fn new(transport: RelayTransport, store: SessionStore, refresh_url: String) -> Self {
        Self {
            inner: Arc::new(RefreshInner {
                transport,
                store,
                refresh_url,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Renew the session. Returns true if new tokens were stored.
    ///
    /// Makes a single attempt. Only an authorization failure clears the
    /// session; transient failures leave it in place. The exchange runs on
    /// its own task, so it completes and stores its result even if every
    /// caller stops waiting.
    pub async fn refresh(&self) -> bool {
        let in_flight = {
            let mut slot = self.slot();
            match slot.as_ref() {
                Some(existing) => {
                    debug!("Joining in-flight refresh");
                    existing.clone()
                }
                None => {
                    let this = self.clone();
                    let task = tokio::spawn(async move {
                        let _release = ReleaseSlot(this.clone());
                        this.exchange().await
                    });
                    let fut = async move {
                        task.await.unwrap_or_else(|e| {
                            warn!(error = %e, "Refresh task ended abnormally");
                            false
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        in_flight.await
    }

    /// Returns true while a refresh exchange is running.
    pub fn is_refreshing(&self) -> bool {
        self.slot().is_some()
    }

    /// Derive the current session state.
    pub async fn session_state(&self) -> Result<SessionState> {
        if self.is_refreshing() {
            return Ok(SessionState::Refreshing);
        }
        Ok(match self.inner.store.read().await? {
            Some(tokens) => SessionState::Authenticated(tokens),
            None => SessionState::Anonymous,
        })
    }

    fn slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(skip(self), fields(url = %self.inner.refresh_url))]
    async fn exchange(&self) -> bool {
        let refresh_token = match self.inner.store.refresh_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No refresh token stored, skipping refresh");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read refresh token");
                return false;
            }
        };

        info!("Refreshing session");

        let body = RefreshRequest {
            auth_type: "refreshToken",
            refresh_token: refresh_token.as_str(),
        };
        let payload = match serde_json::to_value(&body) {
            Ok(data) => RelayPayload::new(&self.inner.refresh_url, &Method::POST).with_data(Some(data)),
            Err(e) => {
                warn!(error = %e, "Failed to encode refresh request");
                return false;
            }
        };

        let reply = match self.inner.transport.forward(&payload).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Refresh request failed");
                return false;
            }
        };

        let value = match envelope::decode(reply) {
            Ok(Outcome::Success(value)) => value,
            Ok(Outcome::Http(e)) if e.is_unauthorized() => {
                self.teardown("refresh rejected with HTTP 401").await;
                return false;
            }
            Ok(Outcome::Application(e)) if e.is_unauthorized() => {
                self.teardown("refresh rejected with code 401").await;
                return false;
            }
            Ok(Outcome::Http(e)) => {
                warn!(status = e.status, "Refresh failed, keeping session");
                return false;
            }
            Ok(Outcome::Application(e)) => {
                warn!(code = e.code, "Refresh refused, keeping session");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Unreadable refresh response");
                return false;
            }
        };

        let response: ApiResponse<TokenGrant> = match serde_json::from_value(value) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Unexpected refresh response shape");
                return false;
            }
        };

        if !response.is_ok() {
            warn!(code = ?response.code, "Refresh response carried no success code");
            return false;
        }

        let Some(update) = response
            .data
            .map(TokenGrant::into_update)
            .filter(|u| !u.is_empty())
        else {
            warn!("Refresh response carried no token data");
            return false;
        };

        if let Err(e) = self.inner.store.write(update).await {
            warn!(error = %e, "Failed to store refreshed tokens");
            return false;
        }

        debug!("Session refreshed successfully");
        true
    }

    async fn teardown(&self, reason: &str) {
        info!(reason, "Refresh token rejected, clearing session");
        if let Err(e) = self.inner.store.clear().await {
            warn!(error = %e, "Failed to clear session");
        }
    }
}

/// Empties the in-flight slot when the exchange task finishes or unwinds.
struct ReleaseSlot(RefreshCoordinator);

impl Drop for ReleaseSlot {
    fn drop(&mut self) {
        self.0.slot().take();
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_url", &self.inner.refresh_url)
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}
