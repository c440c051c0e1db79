//! passage-relay - Same-origin request relay for passage.
//!
//! The browser never talks to the backend directly. It posts a description
//! of the call (`{url, method, headers, data}`) to `/api/proxy`, and the relay
//! strips transport headers, attaches the session credentials held in
//! http-only cookies, and forwards it. The same router serves the cookie
//! session endpoints under `/api/session`.

pub mod config;
pub mod error;
pub mod proxy;
pub mod session;
pub mod state;

use axum::Router;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::RelayConfig;
pub use error::{ConfigError, RelayError};
pub use state::RelayState;

/// Build the relay router.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route(passage_core::RELAY_PATH, post(proxy::proxy))
        .route("/api/session", post(session::create))
        .route("/api/session/refresh", post(session::refresh))
        .route("/api/session/logout", post(session::logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the relay on `config.bind` until `shutdown` fires.
pub async fn serve(config: RelayConfig, shutdown: CancellationToken) -> std::io::Result<()> {
    let bind = config.bind;
    let state = RelayState::new(config).map_err(std::io::Error::other)?;
    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "Relay listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Relay stopped");
    Ok(())
}
