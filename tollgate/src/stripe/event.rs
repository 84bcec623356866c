//! Stripe event envelope parsing
//!
//! Event types we act on map to a closed enum. Anything else becomes
//! [`EventKind::Unknown`] and is acknowledged without touching state.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::SubscriptionStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("invalid event envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("invalid {event_type} object: {source}")]
    Object {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("event created timestamp out of range: {0}")]
    Timestamp(i64),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

/// A verified, parsed billing event
#[derive(Debug, Clone, PartialEq)]
pub struct BillingEvent {
    pub id: String,
    pub created: DateTime<Utc>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    SubscriptionCreated(SubscriptionSnapshot),
    SubscriptionUpdated(SubscriptionSnapshot),
    SubscriptionDeleted(SubscriptionSnapshot),
    /// Logged only; subscription events carry the authoritative state
    CheckoutCompleted {
        session_id: String,
        customer_id: Option<String>,
    },
    Unknown(String),
}

impl EventKind {
    pub fn name(&self) -> &str {
        match self {
            Self::SubscriptionCreated(_) => "customer.subscription.created",
            Self::SubscriptionUpdated(_) => "customer.subscription.updated",
            Self::SubscriptionDeleted(_) => "customer.subscription.deleted",
            Self::CheckoutCompleted { .. } => "checkout.session.completed",
            Self::Unknown(t) => t.as_str(),
        }
    }

    pub fn subscription(&self) -> Option<&SubscriptionSnapshot> {
        match self {
            Self::SubscriptionCreated(s)
            | Self::SubscriptionUpdated(s)
            | Self::SubscriptionDeleted(s) => Some(s),
            _ => None,
        }
    }
}

/// Subscription state extracted from a lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub customer_id: String,
    pub subscription_id: String,
    /// Raw Stripe status string
    pub status: String,
    /// First line item's price
    pub price_id: Option<String>,
    pub trial_end: Option<DateTime<Utc>>,
}

impl SubscriptionSnapshot {
    /// Local status plus whether Stripe's value was recognized
    pub fn local_status(&self) -> (SubscriptionStatus, bool) {
        SubscriptionStatus::from_provider(&self.status)
    }
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: String,
    status: String,
    #[serde(default)]
    items: Option<ItemList>,
    #[serde(default)]
    trial_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ItemList {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    #[serde(default)]
    price: Option<Price>,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    #[serde(default)]
    customer: Option<String>,
}

fn object<T: serde::de::DeserializeOwned>(
    event_type: &str,
    value: serde_json::Value,
) -> Result<T, EventParseError> {
    serde_json::from_value(value).map_err(|source| EventParseError::Object {
        event_type: event_type.to_string(),
        source,
    })
}

fn snapshot(event_type: &str, value: serde_json::Value) -> Result<SubscriptionSnapshot, EventParseError> {
    let sub: SubscriptionObject = object(event_type, value)?;
    let price_id = sub
        .items
        .and_then(|items| items.data.into_iter().next())
        .and_then(|item| item.price)
        .map(|price| price.id);
    let trial_end = match sub.trial_end {
        Some(secs) => Some(
            DateTime::from_timestamp(secs, 0).ok_or(EventParseError::Timestamp(secs))?,
        ),
        None => None,
    };
    Ok(SubscriptionSnapshot {
        customer_id: sub.customer,
        subscription_id: sub.id,
        status: sub.status,
        price_id,
        trial_end,
    })
}

impl BillingEvent {
    /// Parse a raw (already verified) webhook body
    pub fn parse(payload: &[u8]) -> Result<Self, EventParseError> {
        let envelope: Envelope =
            serde_json::from_slice(payload).map_err(EventParseError::Envelope)?;
        let created = DateTime::from_timestamp(envelope.created, 0)
            .ok_or(EventParseError::Timestamp(envelope.created))?;

        let event_type = envelope.event_type.as_str();
        let object_value = envelope.data.object;
        let kind = match event_type {
            "customer.subscription.created" => {
                EventKind::SubscriptionCreated(snapshot(event_type, object_value)?)
            }
            "customer.subscription.updated" => {
                EventKind::SubscriptionUpdated(snapshot(event_type, object_value)?)
            }
            "customer.subscription.deleted" => {
                EventKind::SubscriptionDeleted(snapshot(event_type, object_value)?)
            }
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = object(event_type, object_value)?;
                EventKind::CheckoutCompleted {
                    session_id: session.id,
                    customer_id: session.customer,
                }
            }
            other => EventKind::Unknown(other.to_string()),
        };

        Ok(Self {
            id: envelope.id,
            created,
            kind,
        })
    }
}
