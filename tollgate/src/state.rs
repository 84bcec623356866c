//! Application state for tollgate

use std::sync::Arc;

use crate::auth::{RateLimiter, RateLimits};
use crate::config::{Config, StoreBackend};
use crate::db::{AccountStore, MemoryAccountStore, MongoAccountStore};
use crate::reconcile::Reconciler;
use crate::stripe::{BillingGateway, StripeClient};

/// Checkout parameters fixed at startup
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub price_id: String,
    pub trial_period_days: u32,
    /// Redirect base for success/cancel URLs, no trailing slash
    pub public_base_url: String,
}

impl CheckoutSettings {
    pub fn success_url(&self) -> String {
        format!("{}/?success=true", self.public_base_url)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/?canceled=true", self.public_base_url)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Account Store
    pub store: Arc<dyn AccountStore>,
    /// Stripe (or a test double)
    pub billing: Arc<dyn BillingGateway>,
    /// Webhook reconciliation over the same store
    pub reconciler: Reconciler,
    pub checkout: CheckoutSettings,
    /// JWT secret for session tokens
    pub jwt_secret: String,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
    /// Rate limiter for login/registration routes
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Create a new AppState from configuration
    ///
    /// The MongoDB connection is established on first use.
    pub fn new(config: &Config) -> Self {
        let store: Arc<dyn AccountStore> = match config.store_backend {
            StoreBackend::Mongo => Arc::new(MongoAccountStore::new(
                config.mongodb_uri.clone().unwrap_or_default(),
                config.mongodb_database.clone(),
            )),
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory account store, data is lost on restart");
                Arc::new(MemoryAccountStore::new())
            }
        };
        let billing = Arc::new(StripeClient::new(
            config.stripe_secret_key.clone(),
            config.stripe_api_base.clone(),
        ));

        Self::from_parts(
            store,
            billing,
            config.stripe_webhook_secret.clone(),
            config.webhook_tolerance_secs,
            config.reject_stale_events,
            CheckoutSettings {
                price_id: config.stripe_price_id.clone(),
                trial_period_days: config.trial_period_days,
                public_base_url: config.public_base_url.clone(),
            },
            config.jwt_secret.clone(),
            !config.is_development(),
            RateLimits {
                login_per_min: config.login_rate_limit,
                register_per_min: config.register_rate_limit,
                trust_forwarded_for: config.trust_forwarded_for,
            },
        )
    }

    /// Assemble state from already built collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        store: Arc<dyn AccountStore>,
        billing: Arc<dyn BillingGateway>,
        webhook_secret: String,
        webhook_tolerance_secs: i64,
        reject_stale_events: bool,
        checkout: CheckoutSettings,
        jwt_secret: String,
        secure_cookies: bool,
        rate_limits: RateLimits,
    ) -> Self {
        let reconciler = Reconciler::new(
            store.clone(),
            webhook_secret,
            webhook_tolerance_secs,
            reject_stale_events,
        );
        Self {
            store,
            billing,
            reconciler,
            checkout,
            jwt_secret,
            secure_cookies,
            rate_limiter: RateLimiter::new(rate_limits),
        }
    }
}
