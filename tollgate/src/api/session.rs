//! POST /api/login, POST /api/logout

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use http::header::SET_COOKIE;
use serde::Deserialize;
use serde_json::json;
use shared::error::AppError;

use crate::auth::session::{clear_session_cookie, create_token, session_cookie};
use crate::error::ServiceError;
use crate::state::AppState;
use crate::util::verify_password;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state
        .store
        .find_by_email(&req.email)
        .await?
        .filter(|account| verify_password(&req.password, &account.password_hash))
        .ok_or_else(|| {
            tracing::info!("Login failed");
            AppError::invalid_credentials()
        })?;

    let token = create_token(&account.id, &account.email, &state.jwt_secret).map_err(|e| {
        tracing::error!("JWT creation failed: {e}");
        AppError::internal("Token creation failed")
    })?;

    tracing::info!(account_id = %account.id, "Account logged in");

    Ok((
        [(SET_COOKIE, session_cookie(&token, state.secure_cookies))],
        Json(json!({
            "token": token,
            "userId": account.id,
        })),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, clear_session_cookie(state.secure_cookies))],
        Json(json!({ "message": "Logged out" })),
    )
}
