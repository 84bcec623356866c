//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let store = match state.store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Account store unreachable");
            "unavailable"
        }
    };

    Json(serde_json::json!({
        "status": if store == "ok" { "ok" } else { "degraded" },
        "service": "tollgate",
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": option_env!("GIT_HASH").unwrap_or("dev"),
        "store": store,
    }))
}
