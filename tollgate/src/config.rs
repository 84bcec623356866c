//! Server configuration

use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be set in {environment} environment")]
    MissingSecret {
        name: &'static str,
        environment: String,
    },
    #[error("{name} must not be empty in {environment} environment")]
    EmptySecret {
        name: &'static str,
        environment: String,
    },
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which Account Store backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// MongoDB (`users` collection)
    Mongo,
    /// Process-local map, for development without a database
    Memory,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port
    pub http_port: u16,
    /// Account Store backend (env: TOLLGATE_STORE = mongo | memory)
    pub store_backend: StoreBackend,
    /// MongoDB connection string
    pub mongodb_uri: Option<String>,
    /// MongoDB database name
    pub mongodb_database: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Stripe Price ID used for every checkout
    pub stripe_price_id: String,
    /// Stripe API base URL
    pub stripe_api_base: String,
    /// Maximum age of a webhook signature timestamp, in seconds
    pub webhook_tolerance_secs: i64,
    /// Skip subscription events older than the last one applied to an account
    pub reject_stale_events: bool,
    /// Free trial length applied to every checkout
    pub trial_period_days: u32,
    /// Public base URL for checkout redirect targets
    pub public_base_url: String,
    /// JWT secret for session tokens
    pub jwt_secret: String,
    /// Emit logs as JSON
    pub log_json: bool,
    /// Login attempts allowed per IP per minute (0 = unlimited)
    pub login_rate_limit: u32,
    /// Registrations allowed per IP per minute (0 = unlimited)
    pub register_rate_limit: u32,
    /// Key rate limits by X-Forwarded-For; enable only behind a proxy that
    /// overwrites the header
    pub trust_forwarded_for: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let is_dev = environment == "development";

        let store_backend = match lookup("TOLLGATE_STORE").as_deref() {
            None | Some("mongo") => StoreBackend::Mongo,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "TOLLGATE_STORE",
                    value: other.to_string(),
                });
            }
        };

        let mongodb_uri = lookup("MONGODB_URI").filter(|s| !s.is_empty());
        if store_backend == StoreBackend::Mongo && mongodb_uri.is_none() {
            return Err(ConfigError::Missing("MONGODB_URI"));
        }

        let log_json = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => true,
            Some("text") => false,
            None => !is_dev,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            http_port: parse_or(&lookup, "HTTP_PORT", 8080)?,
            store_backend,
            mongodb_uri,
            mongodb_database: lookup("MONGODB_DATABASE").unwrap_or_else(|| "tollgate".into()),
            stripe_secret_key: require_secret(&lookup, "STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: require_secret(&lookup, "STRIPE_WEBHOOK_SECRET", &environment)?,
            stripe_price_id: lookup("STRIPE_PRICE_ID")
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("STRIPE_PRICE_ID"))?,
            stripe_api_base: lookup("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".into())
                .trim_end_matches('/')
                .to_string(),
            webhook_tolerance_secs: parse_or(&lookup, "STRIPE_WEBHOOK_TOLERANCE_SECS", 300)?,
            reject_stale_events: parse_or(&lookup, "RECONCILE_REJECT_STALE", false)?,
            trial_period_days: parse_or(&lookup, "TRIAL_PERIOD_DAYS", 7)?,
            public_base_url: lookup("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".into())
                .trim_end_matches('/')
                .to_string(),
            jwt_secret: require_secret(&lookup, "JWT_SECRET", &environment)?,
            log_json,
            login_rate_limit: parse_or(&lookup, "RATE_LIMIT_LOGIN_PER_MIN", 5)?,
            register_rate_limit: parse_or(&lookup, "RATE_LIMIT_REGISTER_PER_MIN", 3)?,
            trust_forwarded_for: parse_or(&lookup, "TRUST_FORWARDED_FOR", false)?,
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// Require a secret: must be set and non-empty outside development.
///
/// Development replaces an unset or blank value with a placeholder, so the
/// webhook HMAC key is never empty.
fn require_secret<F>(
    lookup: &F,
    name: &'static str,
    environment: &str,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ if environment == "development" => Ok(format!("dev-{name}-not-for-production")),
        Some(_) => Err(ConfigError::EmptySecret {
            name,
            environment: environment.to_string(),
        }),
        None => Err(ConfigError::MissingSecret {
            name,
            environment: environment.to_string(),
        }),
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
