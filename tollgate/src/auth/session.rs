//! Session tokens for account holders
//!
//! HS256 JWT carried in an HttpOnly cookie, or as `Authorization: Bearer`
//! for non-browser clients.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "tollgate_session";

const JWT_EXPIRY_HOURS: i64 = 24;

/// JWT claims for a session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account ID
    pub sub: String,
    pub email: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated account identity extracted from the session token
#[derive(Debug, Clone)]
pub struct AccountIdentity {
    pub account_id: String,
    pub email: String,
}

pub fn create_token(
    account_id: &str,
    email: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = SessionClaims {
        sub: account_id.to_string(),
        email: email.to_string(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<SessionClaims, AppError> {
    jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired)
            }
            _ => AppError::new(ErrorCode::TokenInvalid),
        }
    })
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, token.to_owned()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(cookie::time::Duration::hours(JWT_EXPIRY_HOURS))
        .build()
        .to_string()
}

/// `Set-Cookie` value that clears the session
pub fn clear_session_cookie(secure: bool) -> String {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(cookie::time::Duration::ZERO)
        .build()
        .to_string()
}

/// Bearer token first, then the session cookie
fn session_token(request: &Request) -> Option<String> {
    let headers = request.headers();

    if let Some(token) = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_owned());
    }

    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_owned())
}

/// Middleware that verifies the session and injects [`AccountIdentity`]
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = session_token(&request)
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let claims = verify_token(&token, &state.jwt_secret).map_err(IntoResponse::into_response)?;

    request.extensions_mut().insert(AccountIdentity {
        account_id: claims.sub,
        email: claims.email,
    });

    Ok(next.run(request).await)
}
