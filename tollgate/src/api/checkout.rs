//! POST /api/checkout: start a subscription purchase

use axum::{Extension, Json, extract::State};
use shared::error::{AppError, ErrorCode};

use crate::auth::AccountIdentity;
use crate::state::AppState;
use crate::stripe::CheckoutRequest;

use super::ApiResult;

pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(identity): Extension<AccountIdentity>,
) -> ApiResult<serde_json::Value> {
    let account = state
        .store
        .find_by_id(&identity.account_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound))?;

    let customer_id = account
        .stripe_customer_id
        .ok_or_else(|| AppError::new(ErrorCode::BillingCustomerMissing))?;

    let settings = &state.checkout;
    let url = state
        .billing
        .create_checkout_session(&CheckoutRequest {
            customer_id,
            price_id: settings.price_id.clone(),
            trial_period_days: settings.trial_period_days,
            success_url: settings.success_url(),
            cancel_url: settings.cancel_url(),
        })
        .await?;

    tracing::info!(account_id = %account.id, "Checkout session created");

    Ok(Json(serde_json::json!({ "url": url })))
}
