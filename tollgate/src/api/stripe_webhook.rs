//! Stripe webhook handler
//!
//! POST /api/webhook (alias /stripe/webhook). Takes the raw body so the
//! signature is checked over the exact bytes Stripe signed.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;

use crate::state::AppState;
use crate::stripe::signature::SIGNATURE_HEADER;

use super::ApiResult;

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<serde_json::Value> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state.reconciler.reconcile(&body, signature).await?;
    tracing::debug!(?outcome, "Webhook processed");

    Ok(Json(serde_json::json!({ "received": true })))
}
