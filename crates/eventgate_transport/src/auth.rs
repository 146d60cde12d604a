//! Auth gate
//!
//! Tokens are HS256 JWTs signed with `auth.app_key`. Two credential pairs may
//! log in: the client pair gets the `subscriber` role, the broadcaster pair
//! the `broadcaster` role. Only broadcasters may publish or stop the server.
//!
//! Requests carry their token as `Authorization: Bearer <jwt>`. The event
//! stream alone also accepts the `sse_token` cookie set by `/login` (base64 of
//! `{"token":..,"id":..}`), because browser `EventSource` cannot send custom
//! headers; the header wins when both are present. Endpoints with side effects
//! never look at the cookie, so a cross-site form post carries no credential.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use eventgate_config::AuthSettings;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::ApiError;
use crate::message::{Claims, TokenResponse};
use crate::server::AppState;

pub const TOKEN_COOKIE: &str = "sse_token";

/// Ten years; longer lifetimes are clamped.
const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Subscriber,
    Broadcaster,
}

/// Why a request was turned away. Callers only see 401/403; the reason is
/// logged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,
    #[error("malformed credential")]
    MalformedCredential,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("expired credential")]
    Expired,
}

/// Who is behind an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    fn matches(&self, username: &str, password: &str) -> bool {
        !username.is_empty()
            && !password.is_empty()
            && self.username == username
            && self.password == password
    }
}

pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
    client: Credentials,
    broadcaster: Credentials,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(settings.app_key.as_bytes()),
            decoding: DecodingKey::from_secret(settings.app_key.as_bytes()),
            validation,
            token_ttl: Duration::seconds(settings.token_ttl_secs.min(MAX_TOKEN_TTL_SECS) as i64),
            client: Credentials {
                username: settings.client_username.clone(),
                password: settings.client_password.clone(),
            },
            broadcaster: Credentials {
                username: settings.broadcaster_username.clone(),
                password: settings.broadcaster_password.clone(),
            },
        }
    }

    /// Role granted to a username/password pair, if any.
    pub fn check_credentials(&self, username: &str, password: &str) -> Option<Role> {
        if self.broadcaster.matches(username, password) {
            Some(Role::Broadcaster)
        } else if self.client.matches(username, password) {
            Some(Role::Subscriber)
        } else {
            None
        }
    }

    pub fn issue(
        &self,
        subject: &str,
        username: &str,
        role: Role,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;
        let claims = Claims {
            sub: subject.to_string(),
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        self.sign(&claims).map(|token| IssuedToken { token, expires_at })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedCredential,
            }
        })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::MalformedCredential);
        }
        Ok(Identity {
            subject: claims.sub,
            username: claims.username,
            role: claims.role,
        })
    }

    /// Resolve the identity behind the request's bearer header.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = header_credential(headers)?.ok_or(AuthError::MissingCredential)?;
        self.verify(&token)
    }

    /// Like [`Authenticator::authenticate`], falling back to the `sse_token`
    /// cookie. Only for the read-only event stream.
    pub fn authenticate_stream(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = match header_credential(headers)? {
            Some(token) => token,
            None => match cookie_value(headers, TOKEN_COOKIE) {
                Some(raw) => decode_token_cookie(raw)?,
                None => return Err(AuthError::MissingCredential),
            },
        };
        self.verify(&token)
    }
}

/// Bearer token from `Authorization`, `None` when the header is absent.
fn header_credential(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;
    bearer_token(value)
        .map(|token| Some(token.to_string()))
        .ok_or(AuthError::MalformedCredential)
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn decode_token_cookie(raw: &str) -> Result<String, AuthError> {
    let json = STANDARD
        .decode(raw.trim_matches('"'))
        .map_err(|_| AuthError::MalformedCredential)?;
    let cookie: TokenResponse =
        serde_json::from_slice(&json).map_err(|_| AuthError::MalformedCredential)?;
    Ok(cookie.token)
}

/// `Set-Cookie` value carrying `body` until `expires_at`.
pub fn token_cookie(
    body: &TokenResponse,
    expires_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(body)?;
    Ok(format!(
        "{TOKEN_COOKIE}={}; Path=/; Expires={}; SameSite=Strict; HttpOnly",
        STANDARD.encode(json),
        expires_at.format("%a, %d %b %Y %H:%M:%S GMT")
    ))
}

fn rejected(parts: &Parts, err: AuthError) -> ApiError {
    warn!("Rejected {} {}: {err}", parts.method, parts.uri.path());
    ApiError::from(err)
}

/// Any authenticated caller of the event stream, by header or cookie.
#[derive(Debug, Clone)]
pub struct StreamCaller(pub Identity);

impl FromRequestParts<AppState> for StreamCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .auth
            .authenticate_stream(&parts.headers)
            .map(StreamCaller)
            .map_err(|err| rejected(parts, err))
    }
}

/// A bearer-authenticated caller holding the broadcaster role.
#[derive(Debug, Clone)]
pub struct Broadcaster(pub Identity);

impl FromRequestParts<AppState> for Broadcaster {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = state
            .auth
            .authenticate(&parts.headers)
            .map_err(|err| rejected(parts, err))?;
        if identity.role != Role::Broadcaster {
            warn!(
                "{} may not call {} {}",
                identity.subject,
                parts.method,
                parts.uri.path()
            );
            return Err(ApiError::Forbidden);
        }
        Ok(Broadcaster(identity))
    }
}
