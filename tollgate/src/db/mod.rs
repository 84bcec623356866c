//! Account Store
//!
//! One record per user. Writes happen in two places only: registration
//! (`insert`) and subscription reconciliation (`apply_subscription`).

pub mod connection;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{AccountView, SubscriptionStatus};
use thiserror::Error;

pub use memory::MemoryAccountStore;
pub use mongo::MongoAccountStore;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Persisted account record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Trimmed and lowercased
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Assigned at registration, never rewritten
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub plan_id: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// `created` time of the last provider event applied
    pub last_event_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// New inactive account with its billing customer already assigned
    pub fn new(
        id: String,
        name: String,
        email: &str,
        password_hash: String,
        stripe_customer_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            email: shared::util::normalize_email(email),
            password_hash,
            stripe_customer_id: Some(stripe_customer_id),
            stripe_subscription_id: None,
            subscription_status: SubscriptionStatus::Inactive,
            plan_id: None,
            trial_ends_at: None,
            last_event_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            subscription_status: self.subscription_status,
            plan_id: self.plan_id.clone(),
            trial_ends_at: self.trial_ends_at,
            stripe_customer_id: self.stripe_customer_id.clone(),
            has_access: self.subscription_status.grants_access(),
        }
    }

    /// Overwrite the subscription fields (full replace, not merge)
    pub(crate) fn apply(&mut self, update: &SubscriptionUpdate) {
        self.stripe_subscription_id = Some(update.subscription_id.clone());
        self.subscription_status = update.status;
        self.plan_id = update.plan_id.clone();
        self.trial_ends_at = update.trial_ends_at;
        self.last_event_at = Some(update.event_created);
        self.updated_at = Utc::now();
    }
}

/// Subscription state carried by one provider event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub plan_id: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub event_created: DateTime<Utc>,
}

/// Result of a conditional subscription write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Written; carries the account as stored afterwards
    Applied(Account),
    /// Account exists but already holds a newer event
    Stale,
    /// No account owns this billing customer
    NoMatch,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique field {field}")]
    Duplicate { field: &'static str },
    #[error("database error: {0}")]
    Database(#[source] BoxError),
    #[error("corrupt account record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

impl StoreError {
    pub fn database(e: impl Into<BoxError>) -> Self {
        Self::Database(e.into())
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Fails with `Duplicate` on email or customer id collision.
    async fn insert(&self, account: &Account) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError>;

    /// Lookup by email (normalized before matching)
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_customer_id(&self, customer_id: &str)
    -> Result<Option<Account>, StoreError>;

    /// Apply subscription state to the account owning `customer_id`.
    ///
    /// With `reject_stale`, the write only happens when the stored
    /// `last_event_at` is absent or not newer than `update.event_created`.
    async fn apply_subscription(
        &self,
        customer_id: &str,
        update: &SubscriptionUpdate,
        reject_stale: bool,
    ) -> Result<ApplyOutcome, StoreError>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_inactive_with_customer() {
        let account = Account::new(
            "acc-1".into(),
            "Ada Lovelace".into(),
            " Ada@Example.com ",
            "hash".into(),
            "cus_1".into(),
        );
        assert_eq!(account.email, "ada@example.com");
        assert_eq!(account.subscription_status, SubscriptionStatus::Inactive);
        assert_eq!(account.stripe_customer_id.as_deref(), Some("cus_1"));
        assert!(account.trial_ends_at.is_none());
        assert!(!account.view().has_access);
    }

    #[test]
    fn test_apply_replaces_fields() {
        let mut account = Account::new(
            "acc-1".into(),
            "Ada Lovelace".into(),
            "ada@example.com",
            "hash".into(),
            "cus_1".into(),
        );
        account.plan_id = Some("price_old".into());
        account.trial_ends_at = Some(Utc::now());

        let update = SubscriptionUpdate {
            subscription_id: "sub_1".into(),
            status: SubscriptionStatus::Active,
            plan_id: None,
            trial_ends_at: None,
            event_created: Utc::now(),
        };
        account.apply(&update);

        assert_eq!(account.subscription_status, SubscriptionStatus::Active);
        assert_eq!(account.stripe_subscription_id.as_deref(), Some("sub_1"));
        assert!(account.plan_id.is_none());
        assert!(account.trial_ends_at.is_none());
        assert_eq!(account.last_event_at, Some(update.event_created));
        assert_eq!(account.stripe_customer_id.as_deref(), Some("cus_1"));
        assert!(account.view().has_access);
    }
}
