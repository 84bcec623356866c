//! Unified error codes for Tollgate
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Account errors
//! - 3xxx: Billing errors
//! - 9xxx: System errors

use serde::Serialize;
use std::fmt;

/// Unified error code enum
///
/// Serialized as its numeric value so clients can switch on it without
/// parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Too many requests from the same client
    TooManyRequests = 6,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Account ====================
    /// Account not found
    AccountNotFound = 2001,
    /// Email is already registered
    EmailAlreadyRegistered = 2002,
    /// Password too short
    PasswordTooShort = 2003,
    /// Email address is malformed
    InvalidEmail = 2004,
    /// Account has no billing customer attached
    BillingCustomerMissing = 2005,

    // ==================== 3xxx: Billing ====================
    /// Webhook signature is missing, malformed or does not match
    WebhookSignatureInvalid = 3001,
    /// Webhook payload could not be parsed
    WebhookPayloadInvalid = 3002,
    /// Billing provider request failed
    PaymentSetupFailed = 3003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            // Auth
            ErrorCode::NotAuthenticated => "Unauthorized",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Session has expired",
            ErrorCode::TokenInvalid => "Session token is invalid",

            // Account
            ErrorCode::AccountNotFound => "User not found",
            ErrorCode::EmailAlreadyRegistered => "User already exists",
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",
            ErrorCode::InvalidEmail => "Invalid email",
            ErrorCode::BillingCustomerMissing => "Account has no billing customer",

            // Billing
            ErrorCode::WebhookSignatureInvalid => "Webhook signature verification failed",
            ErrorCode::WebhookPayloadInvalid => "Webhook payload is invalid",
            ErrorCode::PaymentSetupFailed => "Payment setup failed",

            // System
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
