use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::health::{provider_status, HealthState, HealthStatus};
use crate::state::AppState;

/// GET /health
/// Returns the cached provider snapshot; 503 only when no provider is configured.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthState>) {
    let snapshot = state.health.read().await.clone();
    let status = if snapshot.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(snapshot))
}

/// GET /status
/// Probes every provider now instead of reading the cache.
pub async fn status_handler(State(state): State<AppState>) -> Json<HealthState> {
    let details = provider_status(&state.registry, state.probe_timeout).await;
    let mut snapshot = HealthState::unknown(state.formatter.primary());
    snapshot.apply(details);
    Json(snapshot)
}

/// GET /live
pub async fn live_handler() -> Json<Value> {
    Json(json!({ "status": "up" }))
}
