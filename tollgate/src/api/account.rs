//! GET /api/account: dashboard view of the signed-in account

use axum::{Extension, Json, extract::State};
use shared::AccountView;
use shared::error::{AppError, ErrorCode};

use crate::auth::AccountIdentity;
use crate::state::AppState;

use super::ApiResult;

pub async fn get_account(
    State(state): State<AppState>,
    Extension(identity): Extension<AccountIdentity>,
) -> ApiResult<AccountView> {
    let account = state
        .store
        .find_by_id(&identity.account_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound))?;

    Ok(Json(account.view()))
}
