//! HTTP server
//!
//! Builds the axum router over a shared [`AppState`] and runs it until the
//! process-wide [`Shutdown`] fires. On shutdown the broker is stopped first,
//! which closes every delivery queue and so ends every open stream; axum then
//! finishes draining the connections.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use eventgate_broker::BrokerHandle;
use eventgate_config::Settings;
use eventgate_utils::ServeError;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::auth::Authenticator;
use crate::shutdown::Shutdown;
use crate::{admin, publish, session, sse};

#[derive(Debug, Clone)]
pub struct AppState {
    pub broker: BrokerHandle,
    pub auth: Arc<Authenticator>,
    pub shutdown: Shutdown,
    /// Comment-frame interval on idle streams, `None` when disabled.
    pub keep_alive: Option<Duration>,
}

impl AppState {
    pub fn new(broker: BrokerHandle, settings: &Settings, shutdown: Shutdown) -> Self {
        let keep_alive = match settings.server.keep_alive_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            broker,
            auth: Arc::new(Authenticator::new(&settings.auth)),
            shutdown,
            keep_alive,
        }
    }
}

pub fn router(state: AppState, allowed_origin: Option<&str>) -> Router {
    let router = Router::new()
        .route("/events", get(sse::stream_events))
        .route("/broadcast", post(publish::publish))
        .route("/login", post(session::login))
        .route("/admin/stop", post(admin::stop))
        .route("/health", get(admin::health))
        .with_state(state);

    match allowed_origin.and_then(cors_layer) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    if origin == "*" {
        return Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(e) => {
            warn!("Ignoring invalid allowed origin {origin:?}: {e}");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .expose_headers([AUTHORIZATION])
            .allow_credentials(true),
    )
}

pub async fn start_http_server(
    settings: &Settings,
    broker: BrokerHandle,
    shutdown: Shutdown,
) -> Result<(), ServeError> {
    let addr = settings.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: addr.clone(),
            source,
        })?;

    let state = AppState::new(broker.clone(), settings, shutdown.clone());
    let app = router(state, settings.server.allowed_origin.as_deref());

    info!("SSE server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.wait().await;
            info!("Shutting down, closing all event streams");
            if broker.shutdown().is_err() {
                warn!("Broker already stopped");
            }
        })
        .await?;

    info!("SSE server stopped");
    Ok(())
}
