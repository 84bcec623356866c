//! MongoDB Account Store (`users` collection)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use shared::SubscriptionStatus;

use super::connection::LazyHandle;
use super::{Account, AccountStore, ApplyOutcome, BoxError, StoreError, SubscriptionUpdate};

const USERS: &str = "users";
const DUPLICATE_KEY: i32 = 11000;

/// Stored document layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    password: String,
    /// Absent (not null) until assigned, so the sparse unique index skips it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stripe_customer_id: Option<String>,
    #[serde(default)]
    stripe_subscription_id: Option<String>,
    subscription_status: String,
    #[serde(default)]
    plan_id: Option<String>,
    #[serde(default)]
    trial_ends_at: Option<bson::DateTime>,
    #[serde(default)]
    last_event_at: Option<bson::DateTime>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

fn to_bson_time(t: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(t.timestamp_millis())
}

fn from_bson_time(t: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(t.timestamp_millis()).unwrap_or_default()
}

impl From<&Account> for AccountDocument {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            email: a.email.clone(),
            password: a.password_hash.clone(),
            stripe_customer_id: a.stripe_customer_id.clone(),
            stripe_subscription_id: a.stripe_subscription_id.clone(),
            subscription_status: a.subscription_status.as_db().to_string(),
            plan_id: a.plan_id.clone(),
            trial_ends_at: a.trial_ends_at.map(to_bson_time),
            last_event_at: a.last_event_at.map(to_bson_time),
            created_at: to_bson_time(a.created_at),
            updated_at: to_bson_time(a.updated_at),
        }
    }
}

impl TryFrom<AccountDocument> for Account {
    type Error = StoreError;

    fn try_from(d: AccountDocument) -> Result<Self, Self::Error> {
        let subscription_status =
            SubscriptionStatus::from_db(&d.subscription_status).ok_or_else(|| {
                StoreError::Corrupt {
                    id: d.id.clone(),
                    reason: format!("unknown subscriptionStatus {:?}", d.subscription_status),
                }
            })?;
        Ok(Self {
            id: d.id,
            name: d.name,
            email: d.email,
            password_hash: d.password,
            stripe_customer_id: d.stripe_customer_id,
            stripe_subscription_id: d.stripe_subscription_id,
            subscription_status,
            plan_id: d.plan_id,
            trial_ends_at: d.trial_ends_at.map(from_bson_time),
            last_event_at: d.last_event_at.map(from_bson_time),
            created_at: from_bson_time(d.created_at),
            updated_at: from_bson_time(d.updated_at),
        })
    }
}

#[derive(Clone)]
struct MongoHandle {
    db: Database,
    users: Collection<AccountDocument>,
}

/// MongoDB-backed store; connects on first use
#[derive(Clone)]
pub struct MongoAccountStore {
    handle: LazyHandle<MongoHandle>,
}

impl MongoAccountStore {
    pub fn new(uri: impl Into<String>, db_name: impl Into<String>) -> Self {
        let uri = uri.into();
        let db_name = db_name.into();
        let handle = LazyHandle::new(move || connect(uri.clone(), db_name.clone()));
        Self { handle }
    }

    async fn users(&self) -> Result<&Collection<AccountDocument>, StoreError> {
        self.handle
            .get()
            .await
            .map(|h| &h.users)
            .map_err(StoreError::Database)
    }
}

async fn connect(uri: String, db_name: String) -> Result<MongoHandle, BoxError> {
    let client = Client::with_uri_str(&uri).await?;
    let db = client.database(&db_name);
    db.run_command(doc! { "ping": 1 }).await?;

    let users = db.collection::<AccountDocument>(USERS);
    users
        .create_indexes([
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "stripeCustomerId": 1 })
                .options(IndexOptions::builder().unique(true).sparse(true).build())
                .build(),
        ])
        .await?;

    tracing::info!(database = %db_name, "Connected to MongoDB");
    Ok(MongoHandle { db, users })
}

/// Field named by a unique-index violation, if `code` is one
fn duplicate_field(code: i32, message: &str) -> Option<&'static str> {
    if code != DUPLICATE_KEY {
        return None;
    }
    Some(if message.contains("stripeCustomerId") {
        "stripeCustomerId"
    } else if message.contains("email") {
        "email"
    } else {
        "_id"
    })
}

/// Map a driver error, recognizing unique-index violations
fn map_write_error(e: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(we)) = e.kind.as_ref()
        && let Some(field) = duplicate_field(we.code, &we.message)
    {
        return StoreError::Duplicate { field };
    }
    StoreError::database(e)
}

/// Match the customer's account; with `reject_stale`, only when the stored
/// event time is absent or not newer than `created`
fn subscription_filter(
    customer_id: &str,
    created: bson::DateTime,
    reject_stale: bool,
) -> Document {
    let mut filter = doc! { "stripeCustomerId": customer_id };
    if reject_stale {
        // `null` also matches a missing field
        filter.insert(
            "$or",
            vec![
                doc! { "lastEventAt": null },
                doc! { "lastEventAt": { "$lte": created } },
            ],
        );
    }
    filter
}

/// Full replace of the subscription fields
fn subscription_set(update: &SubscriptionUpdate, now: DateTime<Utc>) -> Document {
    doc! {
        "$set": {
            "stripeSubscriptionId": update.subscription_id.as_str(),
            "subscriptionStatus": update.status.as_db(),
            "planId": update.plan_id.clone(),
            "trialEndsAt": update.trial_ends_at.map(to_bson_time),
            "lastEventAt": to_bson_time(update.event_created),
            "updatedAt": to_bson_time(now),
        }
    }
}

/// Outcome when the conditional update matched nothing
fn unmatched_outcome(reject_stale: bool, customer_exists: bool) -> ApplyOutcome {
    if reject_stale && customer_exists {
        ApplyOutcome::Stale
    } else {
        ApplyOutcome::NoMatch
    }
}

fn decode(doc: Option<AccountDocument>) -> Result<Option<Account>, StoreError> {
    doc.map(Account::try_from).transpose()
}

#[async_trait]
impl AccountStore for MongoAccountStore {
    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        self.users()
            .await?
            .insert_one(AccountDocument::from(account))
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let doc = self
            .users()
            .await?
            .find_one(doc! { "_id": id })
            .await
            .map_err(StoreError::database)?;
        decode(doc)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = shared::util::normalize_email(email);
        let doc = self
            .users()
            .await?
            .find_one(doc! { "email": email })
            .await
            .map_err(StoreError::database)?;
        decode(doc)
    }

    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        let doc = self
            .users()
            .await?
            .find_one(doc! { "stripeCustomerId": customer_id })
            .await
            .map_err(StoreError::database)?;
        decode(doc)
    }

    async fn apply_subscription(
        &self,
        customer_id: &str,
        update: &SubscriptionUpdate,
        reject_stale: bool,
    ) -> Result<ApplyOutcome, StoreError> {
        let users = self.users().await?;
        let filter =
            subscription_filter(customer_id, to_bson_time(update.event_created), reject_stale);

        let updated = users
            .find_one_and_update(filter, subscription_set(update, Utc::now()))
            .return_document(ReturnDocument::After)
            .await
            .map_err(StoreError::database)?;

        if let Some(account) = decode(updated)? {
            return Ok(ApplyOutcome::Applied(account));
        }
        // Only the guarded update can miss an existing account
        let exists = reject_stale
            && users
                .count_documents(doc! { "stripeCustomerId": customer_id })
                .await
                .map_err(StoreError::database)?
                > 0;
        Ok(unmatched_outcome(reject_stale, exists))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let handle = self.handle.get().await.map_err(StoreError::Database)?;
        handle
            .db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(StoreError::database)?;
        Ok(())
    }
}
