use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use eventgate_broker::Message;
use tracing::{debug, warn};

use crate::auth::Broadcaster;
use crate::error::ApiError;
use crate::server::AppState;

/// `POST /broadcast`: hand one message to the broker for fan-out.
///
/// Answers 201 once the message is queued with the coordinator, before any
/// client has received it.
pub async fn publish(
    State(state): State<AppState>,
    Broadcaster(identity): Broadcaster,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let msg: Message = serde_json::from_slice(&body).map_err(|e| {
        warn!("Bad broadcast body from {}: {e}", identity.subject);
        ApiError::BadRequest(format!("invalid message: {e}"))
    })?;

    // Routing values end up on SSE field lines.
    if has_line_break(&msg.user) || has_line_break(&msg.category) {
        return Err(ApiError::BadRequest(
            "User and Type must not contain line breaks".to_string(),
        ));
    }

    debug!("{} publishing {:?}", identity.subject, msg.route());
    state.broker.publish(msg)?;
    Ok(StatusCode::CREATED)
}

fn has_line_break(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| v.contains(['\r', '\n']))
}
