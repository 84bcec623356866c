//! Application-layer rate limiting for login and registration routes

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::{AppError, ErrorCode};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::state::AppState;

const WINDOW_SECS: u64 = 60;

struct IpEntry {
    count: u32,
    window_start: Instant,
}

/// Requests allowed per IP per minute; 0 disables the check
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub login_per_min: u32,
    pub register_per_min: u32,
    /// Key clients by the first `X-Forwarded-For` entry. Only safe behind a
    /// proxy that overwrites the header; otherwise clients can rotate it.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login_per_min: 5,
            register_per_min: 3,
            trust_forwarded_for: false,
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    limits: RateLimits,
    /// route name -> (IP -> entry)
    inner: Arc<Mutex<HashMap<&'static str, HashMap<String, IpEntry>>>>,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    async fn check(
        &self,
        route: &'static str,
        ip: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> bool {
        if max_requests == 0 {
            return true;
        }

        let mut map = self.inner.lock().await;
        let route_map = map.entry(route).or_default();
        let now = Instant::now();

        let entry = route_map.entry(ip.to_owned()).or_insert_with(|| IpEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start).as_secs() >= window_secs {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= max_requests
    }

    /// Remove entries older than 5 minutes
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let cutoff = std::time::Duration::from_secs(300);
        let now = Instant::now();

        for route_map in map.values_mut() {
            route_map.retain(|_, entry| now.duration_since(entry.window_start) < cutoff);
        }

        map.retain(|_, route_map| !route_map.is_empty());
    }

    #[cfg(test)]
    async fn tracked_ips(&self) -> usize {
        self.inner.lock().await.values().map(HashMap::len).sum()
    }
}

/// Client IP: the peer address, or the first X-Forwarded-For entry when the
/// header comes from a trusted proxy.
fn extract_ip(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for
        && let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
    {
        // First entry is the original client
        if let Some(first) = val.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

fn too_many_requests(route: &'static str, ip: &str) -> Response {
    tracing::warn!(route, ip, "Rate limit exceeded");
    AppError::new(ErrorCode::TooManyRequests).into_response()
}

/// Rate limit middleware for login
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let limiter = &state.rate_limiter;
    let ip = extract_ip(&request, limiter.limits.trust_forwarded_for);
    if !limiter
        .check("login", &ip, limiter.limits.login_per_min, WINDOW_SECS)
        .await
    {
        return Err(too_many_requests("login", &ip));
    }
    Ok(next.run(request).await)
}

/// Rate limit middleware for registration
pub async fn register_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let limiter = &state.rate_limiter;
    let ip = extract_ip(&request, limiter.limits.trust_forwarded_for);
    if !limiter
        .check("register", &ip, limiter.limits.register_per_min, WINDOW_SECS)
        .await
    {
        return Err(too_many_requests("register", &ip));
    }
    Ok(next.run(request).await)
}
