use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::info;

use crate::auth::Broadcaster;
use crate::error::ApiError;
use crate::message::HealthResponse;
use crate::server::AppState;

/// `POST /admin/stop`: begin a graceful shutdown of the whole process.
pub async fn stop(State(state): State<AppState>, Broadcaster(identity): Broadcaster) -> StatusCode {
    info!("Shutdown requested by {}", identity.subject);
    state.shutdown.trigger();
    StatusCode::ACCEPTED
}

/// `GET /health`: liveness plus the number of connected clients.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let clients = state.broker.snapshot().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        clients: clients.len(),
    }))
}
