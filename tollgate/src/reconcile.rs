//! Subscription status reconciliation
//!
//! Verified Stripe lifecycle events are mapped to a [`SubscriptionUpdate`] and
//! written to the account owning the event's customer. Replaying an event
//! yields the same stored state.

use std::sync::Arc;

use thiserror::Error;

use crate::db::{AccountStore, ApplyOutcome, StoreError, SubscriptionUpdate};
use crate::stripe::{BillingEvent, EventKind, EventParseError, SignatureError, signature};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("webhook authentication failed: {0}")]
    Signature(#[from] SignatureError),
    #[error("malformed webhook payload: {0}")]
    Payload(#[from] EventParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What happened to an acknowledged event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied {
        account_id: String,
        status: shared::SubscriptionStatus,
    },
    /// Older than the last event applied to the account
    Stale,
    /// No account owns the event's customer
    NoMatch,
    /// Recognized or unknown type that carries no state change
    Ignored,
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn AccountStore>,
    webhook_secret: String,
    tolerance_secs: i64,
    reject_stale: bool,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn AccountStore>,
        webhook_secret: impl Into<String>,
        tolerance_secs: i64,
        reject_stale: bool,
    ) -> Self {
        Self {
            store,
            webhook_secret: webhook_secret.into(),
            tolerance_secs,
            reject_stale,
        }
    }

    /// Verify, parse and apply one webhook delivery
    pub async fn reconcile(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        signature::verify(
            payload,
            signature_header,
            &self.webhook_secret,
            self.tolerance_secs,
            chrono::Utc::now().timestamp(),
        )?;

        let event = BillingEvent::parse(payload)?;
        tracing::info!(event_id = %event.id, event_type = event.kind.name(), "Received Stripe event");

        self.apply(&event).await
    }

    /// Apply an already verified event
    pub async fn apply(&self, event: &BillingEvent) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(sub) = event.kind.subscription() else {
            match &event.kind {
                EventKind::CheckoutCompleted {
                    session_id,
                    customer_id,
                } => tracing::info!(
                    session_id = %session_id,
                    customer_id = ?customer_id,
                    "Checkout completed, awaiting subscription event"
                ),
                other => {
                    tracing::debug!(event_type = other.name(), "Unhandled Stripe event type")
                }
            }
            return Ok(ReconcileOutcome::Ignored);
        };

        let (status, recognized) = sub.local_status();
        if !recognized {
            tracing::warn!(
                event_id = %event.id,
                stripe_status = %sub.status,
                "Unrecognized Stripe subscription status, treating as inactive"
            );
        }

        let update = SubscriptionUpdate {
            subscription_id: sub.subscription_id.clone(),
            status,
            plan_id: sub.price_id.clone(),
            trial_ends_at: sub.trial_end,
            event_created: event.created,
        };

        let outcome = self
            .store
            .apply_subscription(&sub.customer_id, &update, self.reject_stale)
            .await?;

        Ok(match outcome {
            ApplyOutcome::Applied(account) => {
                tracing::info!(
                    account_id = %account.id,
                    customer_id = %sub.customer_id,
                    status = %account.subscription_status,
                    "Subscription status updated"
                );
                ReconcileOutcome::Applied {
                    account_id: account.id,
                    status: account.subscription_status,
                }
            }
            ApplyOutcome::Stale => {
                tracing::info!(
                    event_id = %event.id,
                    customer_id = %sub.customer_id,
                    "Skipping stale subscription event"
                );
                ReconcileOutcome::Stale
            }
            ApplyOutcome::NoMatch => {
                tracing::warn!(
                    event_id = %event.id,
                    customer_id = %sub.customer_id,
                    "No account for Stripe customer"
                );
                ReconcileOutcome::NoMatch
            }
        })
    }
}
