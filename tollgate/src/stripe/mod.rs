//! Stripe integration via REST API (no SDK dependency)

pub mod event;
pub mod signature;

use async_trait::async_trait;
use thiserror::Error;

pub use event::{BillingEvent, EventKind, EventParseError, SubscriptionSnapshot};
pub use signature::SignatureError;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected Stripe response: missing {0}")]
    MissingField(&'static str),
}

/// Customer to create at registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: String,
    pub name: String,
    pub account_id: String,
}

/// Subscription checkout for one customer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub price_id: String,
    pub trial_period_days: u32,
    pub success_url: String,
    pub cancel_url: String,
}

/// Outbound calls to the billing provider
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Create a customer, returning its id
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, BillingError>;

    /// Create a subscription Checkout Session, returning its redirect URL
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<String, BillingError>;
}

/// Stripe REST client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into(),
        }
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value, BillingError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            // Proxies may answer with HTML; keep the status either way
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(resp.json().await?)
    }
}

const ERROR_BODY_LIMIT: usize = 200;

/// Error from a non-2xx response, preferring Stripe's `error.message`
fn api_error(status: u16, body: &str) -> BillingError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| {
            let text = body.trim();
            if text.is_empty() {
                "empty response body".to_string()
            } else {
                text.chars().take(ERROR_BODY_LIMIT).collect()
            }
        });
    BillingError::Api { status, message }
}

#[async_trait]
impl BillingGateway for StripeClient {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, BillingError> {
        let resp = self
            .post_form(
                "/v1/customers",
                &[
                    ("email", customer.email.as_str()),
                    ("name", customer.name.as_str()),
                    ("metadata[account_id]", customer.account_id.as_str()),
                ],
            )
            .await?;

        resp["id"]
            .as_str()
            .map(String::from)
            .ok_or(BillingError::MissingField("id"))
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<String, BillingError> {
        let trial_days = request.trial_period_days.to_string();
        let resp = self
            .post_form(
                "/v1/checkout/sessions",
                &checkout_form(request, &trial_days),
            )
            .await?;

        resp["url"]
            .as_str()
            .map(String::from)
            .ok_or(BillingError::MissingField("url"))
    }
}

fn checkout_form<'a>(
    request: &'a CheckoutRequest,
    trial_days: &'a str,
) -> Vec<(&'a str, &'a str)> {
    vec![
        ("customer", request.customer_id.as_str()),
        ("mode", "subscription"),
        ("payment_method_types[0]", "card"),
        ("payment_method_collection", "always"),
        ("line_items[0][price]", request.price_id.as_str()),
        ("line_items[0][quantity]", "1"),
        ("subscription_data[trial_period_days]", trial_days),
        ("success_url", request.success_url.as_str()),
        ("cancel_url", request.cancel_url.as_str()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_form_fields() {
        let request = CheckoutRequest {
            customer_id: "cus_1".into(),
            price_id: "price_123".into(),
            trial_period_days: 7,
            success_url: "http://localhost:3000/?success=true".into(),
            cancel_url: "http://localhost:3000/?canceled=true".into(),
        };
        let form = checkout_form(&request, "7");
        let get = |key: &str| form.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

        assert_eq!(get("mode"), Some("subscription"));
        assert_eq!(get("customer"), Some("cus_1"));
        assert_eq!(get("payment_method_collection"), Some("always"));
        assert_eq!(get("line_items[0][price]"), Some("price_123"));
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("subscription_data[trial_period_days]"), Some("7"));
        assert_eq!(get("cancel_url"), Some("http://localhost:3000/?canceled=true"));
    }

    #[test]
    fn test_api_error_uses_stripe_message() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"No such price: 'price_x'"}}"#;
        let BillingError::Api { status, message } = api_error(400, body) else {
            panic!("expected api error");
        };
        assert_eq!(status, 400);
        assert_eq!(message, "No such price: 'price_x'");
    }

    #[test]
    fn test_api_error_keeps_status_for_non_json_body() {
        let body = "<html><body><h1>502 Bad Gateway</h1></body></html>";
        let BillingError::Api { status, message } = api_error(502, body) else {
            panic!("expected api error");
        };
        assert_eq!(status, 502);
        assert!(message.contains("502 Bad Gateway"));

        let long = "x".repeat(1000);
        let BillingError::Api { message, .. } = api_error(503, &long) else {
            panic!("expected api error");
        };
        assert_eq!(message.len(), ERROR_BODY_LIMIT);

        let BillingError::Api { message, .. } = api_error(504, "") else {
            panic!("expected api error");
        };
        assert_eq!(message, "empty response body");
    }

    #[tokio::test]
    async fn test_gateway_error_page_reports_status() {
        use axum::Router;
        use axum::http::StatusCode;
        use axum::response::Html;
        use axum::routing::post;

        let app = Router::new().route(
            "/v1/customers",
            post(|| async { (StatusCode::BAD_GATEWAY, Html("<h1>502 Bad Gateway</h1>")) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let client = StripeClient::new("sk_test", format!("http://{addr}"));
        let err = client
            .create_customer(&NewCustomer {
                email: "ada@example.com".into(),
                name: "Ada Lovelace".into(),
                account_id: "acc-1".into(),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, BillingError::Api { status: 502, .. }),
            "unexpected error {err:?}"
        );
    }
}
