//! POST /api/register: create an account and its Stripe customer

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};

use crate::db::Account;
use crate::state::AppState;
use crate::stripe::NewCustomer;
use crate::util::hash_password;

use super::ApiResult;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.first_name.trim().is_empty() {
            return Err(
                AppError::validation("First name is required").with_detail("field", "firstName")
            );
        }
        if self.last_name.trim().is_empty() {
            return Err(
                AppError::validation("Last name is required").with_detail("field", "lastName")
            );
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::new(ErrorCode::InvalidEmail).with_detail("field", "email"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(
                AppError::new(ErrorCode::PasswordTooShort).with_detail("field", "password")
            );
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Value> {
    req.validate()?;
    let email = shared::util::normalize_email(&req.email);

    // Taken emails never reach Stripe
    if state.store.find_by_email(&email).await?.is_some() {
        return Err(AppError::new(ErrorCode::EmailAlreadyRegistered).into());
    }

    let account_id = uuid::Uuid::new_v4().to_string();
    let name = req.display_name();

    let customer_id = state
        .billing
        .create_customer(&NewCustomer {
            email: email.clone(),
            name: name.clone(),
            account_id: account_id.clone(),
        })
        .await?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(%e, "Password hash error");
        AppError::internal("Password hash error")
    })?;

    let account = Account::new(
        account_id.clone(),
        name,
        &email,
        password_hash,
        customer_id.clone(),
    );
    if let Err(e) = state.store.insert(&account).await {
        tracing::error!(
            account_id = %account_id,
            customer_id = %customer_id,
            error = %e,
            "Account insert failed, Stripe customer left orphaned"
        );
        return Err(e.into());
    }

    tracing::info!(account_id = %account_id, customer_id = %customer_id, "Account registered");

    Ok(Json(json!({
        "message": "User created",
        "userId": account_id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(first: &str, last: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_validation() {
        assert!(request("Ada", "Lovelace", "ada@example.com", "password1").validate().is_ok());

        let err = request("", "Lovelace", "ada@example.com", "password1").validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = request("Ada", "  ", "ada@example.com", "password1").validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = request("Ada", "Lovelace", "ada.example.com", "password1").validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidEmail);

        let err = request("Ada", "Lovelace", "ada@example.com", "short").validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::PasswordTooShort);
    }

    #[test]
    fn test_display_name_and_camel_case() {
        let req: RegisterRequest = serde_json::from_value(json!({
            "firstName": " Ada ",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "password": "password1"
        }))
        .unwrap();
        assert_eq!(req.display_name(), "Ada Lovelace");

        let req: RegisterRequest = serde_json::from_value(json!({ "email": "x@y.z" })).unwrap();
        assert!(req.first_name.is_empty());
    }
}
