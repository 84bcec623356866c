//! tollgate: subscription-gated account service
//!
//! - Registers accounts and their Stripe customers
//! - Issues session cookies and starts subscription checkouts
//! - Reconciles subscription status from signed Stripe webhooks

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod reconcile;
pub mod state;
pub mod stripe;
pub mod util;

pub use config::Config;
pub use state::AppState;
