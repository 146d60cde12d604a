//! HTTP transport
//!
//! Serves the broker over plain HTTP:
//! - `GET /events?type=<category>`: authenticated Server-Sent Events stream
//! - `POST /broadcast`: publish a message (broadcaster role)
//! - `POST /login`: exchange credentials for a token and cookie
//! - `POST /admin/stop`: graceful shutdown (broadcaster role)
//! - `GET /health`: liveness and connected-client count

pub mod admin;
pub mod auth;
pub mod error;
pub mod message;
pub mod publish;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod sse;

pub use auth::{Authenticator, Identity, Role};
pub use error::ApiError;
pub use message::{Claims, LoginRequest, TokenResponse};
pub use server::{AppState, router, start_http_server};
pub use shutdown::Shutdown;
