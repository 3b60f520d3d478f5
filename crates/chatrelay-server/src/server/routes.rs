use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

// ============================================================================
// Health endpoints
// ============================================================================

/// Liveness of this instance. Without its relay loop an instance can
/// neither deliver chat nor write history, so it reports degraded.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let relay_running = !state.relay_task.is_finished();
    let (code, status, relay) = if relay_running {
        (StatusCode::OK, "ok", "running")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "stopped")
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "instance": state.instance_id,
            "connections": state.hub.connection_count(),
            "relay": relay,
        })),
    )
}

// ============================================================================
// Room directory
// ============================================================================

pub async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.directory.snapshot().await)
}

// ============================================================================
// Metrics
// ============================================================================

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}
