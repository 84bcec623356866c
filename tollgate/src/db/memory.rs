//! In-process Account Store
//!
//! Same unique constraints and conditional-update rules as the MongoDB store.
//! Used by tests and by `TOLLGATE_STORE=memory`.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Account, AccountStore, ApplyOutcome, StoreError, SubscriptionUpdate};

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&account.id) {
            return Err(StoreError::Duplicate { field: "_id" });
        }
        for existing in accounts.values() {
            if existing.email == account.email {
                return Err(StoreError::Duplicate { field: "email" });
            }
            if account.stripe_customer_id.is_some()
                && existing.stripe_customer_id == account.stripe_customer_id
            {
                return Err(StoreError::Duplicate {
                    field: "stripeCustomerId",
                });
            }
        }
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = shared::util::normalize_email(email);
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn apply_subscription(
        &self,
        customer_id: &str,
        update: &SubscriptionUpdate,
        reject_stale: bool,
    ) -> Result<ApplyOutcome, StoreError> {
        let mut accounts = self.accounts.write();
        let Some(account) = accounts
            .values_mut()
            .find(|a| a.stripe_customer_id.as_deref() == Some(customer_id))
        else {
            return Ok(ApplyOutcome::NoMatch);
        };

        if reject_stale
            && account
                .last_event_at
                .is_some_and(|last| last > update.event_created)
        {
            return Ok(ApplyOutcome::Stale);
        }

        account.apply(update);
        Ok(ApplyOutcome::Applied(account.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared::SubscriptionStatus;

    fn account(id: &str, email: &str, customer: &str) -> Account {
        Account::new(
            id.into(),
            "Test User".into(),
            email,
            "hash".into(),
            customer.into(),
        )
    }

    fn update(status: SubscriptionStatus, created: chrono::DateTime<Utc>) -> SubscriptionUpdate {
        SubscriptionUpdate {
            subscription_id: "sub_1".into(),
            status,
            plan_id: Some("price_123".into()),
            trial_ends_at: None,
            event_created: created,
        }
    }

    #[tokio::test]
    async fn test_unique_email_and_customer() {
        let store = MemoryAccountStore::new();
        store.insert(&account("a", "a@example.com", "cus_a")).await.unwrap();

        let err = store
            .insert(&account("b", "A@example.com", "cus_b"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "email" }));

        let err = store
            .insert(&account("c", "c@example.com", "cus_a"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Duplicate {
                field: "stripeCustomerId"
            }
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_lookups() {
        let store = MemoryAccountStore::new();
        store.insert(&account("a", "a@example.com", "cus_a")).await.unwrap();

        assert!(store.find_by_id("a").await.unwrap().is_some());
        assert!(store.find_by_email(" A@EXAMPLE.com").await.unwrap().is_some());
        assert!(store.find_by_customer_id("cus_a").await.unwrap().is_some());
        assert!(store.find_by_customer_id("cus_z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_unknown_customer_is_no_match() {
        let store = MemoryAccountStore::new();
        let outcome = store
            .apply_subscription("cus_x", &update(SubscriptionStatus::Active, Utc::now()), false)
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::NoMatch);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_stale_guard() {
        let store = MemoryAccountStore::new();
        store.insert(&account("a", "a@example.com", "cus_a")).await.unwrap();
        let now = Utc::now();

        let outcome = store
            .apply_subscription("cus_a", &update(SubscriptionStatus::Active, now), true)
            .await
            .unwrap();
        assert!(matches!(outcome, ApplyOutcome::Applied(_)));

        let older = update(SubscriptionStatus::Canceled, now - Duration::seconds(10));
        let outcome = store.apply_subscription("cus_a", &older, true).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::Stale);
        let stored = store.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(stored.subscription_status, SubscriptionStatus::Active);

        // Same timestamp still applies
        let same = update(SubscriptionStatus::PastDue, now);
        assert!(matches!(
            store.apply_subscription("cus_a", &same, true).await.unwrap(),
            ApplyOutcome::Applied(_)
        ));

        // Guard off: last write wins
        let outcome = store.apply_subscription("cus_a", &older, false).await.unwrap();
        match outcome {
            ApplyOutcome::Applied(a) => {
                assert_eq!(a.subscription_status, SubscriptionStatus::Canceled)
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }
}
