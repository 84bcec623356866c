//! Shared fixtures for HTTP-level tests
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Request, Response, header};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use tollgate::AppState;
use tollgate::auth::RateLimits;
use tollgate::db::MemoryAccountStore;
use tollgate::state::CheckoutSettings;
use tollgate::stripe::{BillingError, BillingGateway, CheckoutRequest, NewCustomer};

pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const JWT_SECRET: &str = "jwt-test-secret";
pub const PRICE_ID: &str = "price_123";

/// Gateway double that records every call
#[derive(Default)]
pub struct RecordingGateway {
    pub customers: Mutex<Vec<NewCustomer>>,
    pub checkouts: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl BillingGateway for RecordingGateway {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, BillingError> {
        let mut customers = self.customers.lock();
        customers.push(customer.clone());
        Ok(format!("cus_{}", customers.len()))
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<String, BillingError> {
        let mut checkouts = self.checkouts.lock();
        checkouts.push(request.clone());
        Ok(format!("https://checkout.stripe.test/c/{}", checkouts.len()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryAccountStore>,
    pub gateway: Arc<RecordingGateway>,
}

impl TestApp {
    /// Rate limiting off; every test request shares the "unknown" client IP
    pub fn new() -> Self {
        Self::with_options(
            false,
            RateLimits {
                login_per_min: 0,
                register_per_min: 0,
                ..RateLimits::default()
            },
        )
    }

    pub fn with_options(reject_stale: bool, limits: RateLimits) -> Self {
        let store = Arc::new(MemoryAccountStore::new());
        let gateway = Arc::new(RecordingGateway::default());
        let state = AppState::from_parts(
            store.clone(),
            gateway.clone(),
            WEBHOOK_SECRET.to_string(),
            300,
            reject_stale,
            CheckoutSettings {
                price_id: PRICE_ID.to_string(),
                trial_period_days: 7,
                public_base_url: "http://localhost:3000".to_string(),
            },
            JWT_SECRET.to_string(),
            false,
            limits,
        );
        Self {
            router: tollgate::api::create_router(state),
            store,
            gateway,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (Response<Body>, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (Response::from_parts(parts, Body::empty()), json)
    }

    pub async fn register(&self, email: &str, password: &str) -> (Response<Body>, Value) {
        self.send(json_request(
            "/api/register",
            serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": email,
                "password": password,
            }),
        ))
        .await
    }

    /// Register and log in, returning the session token
    pub async fn signed_in(&self, email: &str) -> String {
        let (response, _) = self.register(email, "password123").await;
        assert_eq!(response.status(), 200);
        let (response, body) = self
            .send(json_request(
                "/api/login",
                serde_json::json!({ "email": email, "password": "password123" }),
            ))
            .await;
        assert_eq!(response.status(), 200);
        body["token"].as_str().unwrap().to_string()
    }
}

pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed(method: http::Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("tollgate_session={token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn webhook_request(payload: &[u8], signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/webhook").header(header::CONTENT_TYPE, "application/json");
    if let Some(sig) = signature {
        builder = builder.header("stripe-signature", sig);
    }
    builder.body(Body::from(payload.to_vec())).unwrap()
}

pub fn sign(payload: &[u8]) -> String {
    tollgate::stripe::signature::sign(payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp())
        .unwrap()
}

pub fn subscription_event(
    event_type: &str,
    customer: &str,
    status: &str,
    trial_end: Option<i64>,
    created: i64,
) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": format!("evt_{created}"),
        "object": "event",
        "type": event_type,
        "created": created,
        "data": { "object": {
            "id": "sub_1",
            "object": "subscription",
            "customer": customer,
            "status": status,
            "trial_end": trial_end,
            "items": { "data": [ { "price": { "id": PRICE_ID } } ] }
        }}
    }))
    .unwrap()
}
