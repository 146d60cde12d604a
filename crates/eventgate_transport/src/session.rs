use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use tracing::{error, info, warn};

use crate::auth::token_cookie;
use crate::error::ApiError;
use crate::message::{LoginRequest, TokenResponse};
use crate::server::AppState;

/// `POST /login`: trade a configured credential pair for a signed token.
///
/// The token goes back in the JSON body and in the `sse_token` cookie, so a
/// browser `EventSource` on the same origin is authenticated automatically.
pub async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(HeaderMap, Json<TokenResponse>), ApiError> {
    let req: LoginRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid login request: {e}")))?;

    let Some(role) = state.auth.check_credentials(&req.username, &req.password) else {
        warn!("Failed login for {:?}", req.username);
        return Err(ApiError::InvalidCredentials);
    };

    let subject = req
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| req.username.clone());

    let issued = state
        .auth
        .issue(&subject, &req.username, role)
        .map_err(|e| {
            error!("Failed to sign token for {subject}: {e}");
            ApiError::TokenGeneration
        })?;

    let body = TokenResponse {
        token: issued.token,
        id: subject,
    };

    let mut headers = HeaderMap::new();
    let cookie = token_cookie(&body, issued.expires_at)
        .ok()
        .and_then(|cookie| HeaderValue::from_str(&cookie).ok())
        .ok_or(ApiError::TokenGeneration)?;
    headers.insert(SET_COOKIE, cookie);

    info!("{} logged in as {:?} for {}", req.username, role, body.id);
    Ok((headers, Json(body)))
}
