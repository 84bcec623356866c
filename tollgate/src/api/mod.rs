//! API routes for tollgate

pub mod account;
pub mod checkout;
pub mod health;
pub mod register;
pub mod session;
pub mod stripe_webhook;

use axum::routing::{get, post};
use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::rate_limit::{login_rate_limit, register_rate_limit};
use crate::auth::session_auth_middleware;
use crate::state::AppState;

pub use crate::error::ApiResult;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new()
        .route("/api/webhook", post(stripe_webhook::handle_webhook))
        .route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    let registration = Router::new()
        .route("/api/register", post(register::register))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            register_rate_limit,
        ));

    let login = Router::new()
        .route("/api/login", post(session::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    // Session required
    let account = Router::new()
        .route("/api/checkout", post(checkout::create_checkout))
        .route("/api/account", get(account::get_account))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/logout", post(session::logout))
        .merge(webhook)
        .merge(registration)
        .merge(login)
        .merge(account)
        .layer(TraceLayer::new_for_http())
        // Router layers wrap outward: the id is set before it is propagated
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        .layer(SetRequestIdLayer::new(REQUEST_ID, XRequestId))
        .with_state(state)
}
