use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use eventgate_broker::BrokerError;
use thiserror::Error;

use crate::auth::AuthError;
use crate::message::ErrorResponse;

/// Every way an HTTP request can fail, and the status it maps to.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The connection cannot carry a chunked, incrementally flushed body.
    #[error("Streaming unsupported!")]
    StreamingUnsupported,

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid creds")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),

    #[error("Token generation failed")]
    TokenGeneration,

    #[error("Service unavailable")]
    Unavailable(#[from] BrokerError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::StreamingUnsupported | ApiError::TokenGeneration => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Auth(AuthError::MissingCredential) | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Auth(_) | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Rejection reasons stay in the logs.
        let error = match &self {
            ApiError::Auth(AuthError::MissingCredential) => "Token not found".to_string(),
            ApiError::Auth(_) => "Forbidden".to_string(),
            other => other.to_string(),
        };
        (self.status(), Json(ErrorResponse { error })).into_response()
    }
}
