//! Unified service-layer error type for tollgate
//!
//! `ServiceError` bridges store and Stripe errors to the API-layer error
//! (`AppError`). Handlers use `?` on any of them; infrastructure failures are
//! logged once here and reach the client as a generic 500.

use axum::Json;
use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::db::{BoxError, StoreError};
use crate::reconcile::ReconcileError;
use crate::stripe::BillingError;

#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error (auto-logged, mapped to InternalError)
    Db(BoxError),
    /// Stripe API failure (auto-logged, mapped to PaymentSetupFailed)
    Billing(BillingError),
    /// Business-rule error (transparent pass-through to client)
    App(AppError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate { field: "email" } => {
                ServiceError::App(AppError::new(ErrorCode::EmailAlreadyRegistered))
            }
            other => ServiceError::Db(other.into()),
        }
    }
}

impl From<BillingError> for ServiceError {
    fn from(e: BillingError) -> Self {
        ServiceError::Billing(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ReconcileError> for ServiceError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Signature(err) => {
                tracing::warn!(error = %err, "Webhook signature verification failed");
                ServiceError::App(AppError::with_message(
                    ErrorCode::WebhookSignatureInvalid,
                    err.to_string(),
                ))
            }
            ReconcileError::Payload(err) => {
                tracing::warn!(error = %err, "Rejected webhook payload");
                ServiceError::App(AppError::with_message(
                    ErrorCode::WebhookPayloadInvalid,
                    err.to_string(),
                ))
            }
            ReconcileError::Store(err) => err.into(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
            ServiceError::Billing(billing_err) => {
                tracing::error!(error = %billing_err, "Stripe request failed");
                AppError::new(ErrorCode::PaymentSetupFailed)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Handler result carrying a JSON body
pub type ApiResult<T> = Result<Json<T>, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_duplicate_email_is_conflict() {
        let err: ServiceError = StoreError::Duplicate { field: "email" }.into();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::EmailAlreadyRegistered);
        assert_eq!(app.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_infrastructure_errors_are_opaque() {
        let err: ServiceError = StoreError::database("connection reset").into();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::InternalError);
        assert_eq!(app.http_status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ServiceError = BillingError::MissingField("url").into();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::PaymentSetupFailed);
        assert_eq!(app.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_webhook_errors_are_bad_request() {
        let err: ServiceError =
            ReconcileError::Signature(crate::stripe::SignatureError::Mismatch).into();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::WebhookSignatureInvalid);
        assert_eq!(app.http_status(), StatusCode::BAD_REQUEST);
    }
}
