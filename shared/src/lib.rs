//! Shared types for Tollgate
//!
//! Error system, account types and small utilities used by the server crate
//! and by API clients.

pub mod account;
pub mod error;
pub mod util;

// Re-exports
pub use account::{AccountView, SubscriptionStatus};
pub use http;
