//! Account types shared between the server and its clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription lifecycle status persisted on an account
///
/// Only these five values are ever stored. Provider statuses outside this set
/// are folded into one of them by [`SubscriptionStatus::from_provider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No subscription yet, or an incomplete one
    #[default]
    Inactive,
    /// Inside the free trial window
    Trialing,
    /// Paid and current
    Active,
    /// Renewal payment failed, provider is retrying
    PastDue,
    /// Subscription ended
    Canceled,
}

impl SubscriptionStatus {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "inactive" => Some(Self::Inactive),
            "trialing" => Some(Self::Trialing),
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
        }
    }

    /// Map a Stripe subscription status onto the local status set.
    ///
    /// Returns the mapped status and whether the input was a status Stripe
    /// documents (unrecognized strings fall back to `Inactive`).
    pub fn from_provider(status: &str) -> (Self, bool) {
        match status {
            "trialing" => (Self::Trialing, true),
            "active" => (Self::Active, true),
            "past_due" | "unpaid" => (Self::PastDue, true),
            "canceled" | "incomplete_expired" => (Self::Canceled, true),
            "incomplete" | "paused" => (Self::Inactive, true),
            _ => (Self::Inactive, false),
        }
    }

    /// Does this status unlock the dashboard?
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Dashboard view of an account (no credentials)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subscription_status: SubscriptionStatus,
    pub plan_id: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub has_access: bool,
}
