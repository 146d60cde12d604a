//! JSON bodies exchanged over HTTP, other than the published `Message` itself
//! (which lives in the broker crate).

use serde::{Deserialize, Serialize};

use crate::auth::Role;

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Subject the token is issued for. Defaults to the username.
    #[serde(default)]
    pub id: Option<String>,
}

/// Returned by `/login`; also the JSON stored (base64-encoded) in the
/// `sse_token` cookie.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub token: String,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub clients: usize,
}

/// Query string of the streaming endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    #[serde(rename = "type")]
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}
