//! `/health` liveness probe and `/v1/metrics` counters.

use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::api::auth::AuthenticatedPrincipal;
use crate::state::AppState;

/// Public liveness probe. 200 with a small body whenever the process is
/// up — the broker keeps no persisted state that could be "corrupt", so
/// the only failure mode worth reporting is the process not running at
/// all, which this endpoint being reachable already answers.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Process-lifetime counters. Same auth as every other route; no
/// method-specific RBAC action is defined for it, so any authenticated
/// principal may read it.
pub async fn metrics(
    State(state): State<AppState>,
    AuthenticatedPrincipal(_principal): AuthenticatedPrincipal,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "pool": {
            "size": state.pool.size(),
            "max": state.config.browser.max_browsers,
        },
        "sessions": {
            "active": state.sessions.active_count(),
        },
        "toolCalls": {
            "served": state.metrics.tool_calls_served.load(Ordering::Relaxed),
        },
        "audit": {
            "eventsEmitted": state.audit.events_emitted(),
        },
    }))
}
