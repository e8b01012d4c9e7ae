//! The worker's HTTP control surface: liveness, readiness, detailed status,
//! and flat numeric metrics. Bodies are compact JSON.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::state::WorkerState;

/// Build the control router.
pub fn router(state: Arc<WorkerState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind the control port, falling back to `port + 1` exactly once when the
/// configured port is taken.
///
/// # Errors
///
/// Returns the bind error for the fallback port if both attempts fail.
pub async fn bind_with_fallback(port: u16) -> std::io::Result<TcpListener> {
    match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => Ok(listener),
        Err(e) => {
            let fallback = port.saturating_add(1);
            tracing::warn!(port, fallback, error = %e, "worker port unavailable; trying fallback");
            TcpListener::bind(("0.0.0.0", fallback)).await
        }
    }
}

async fn healthz(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    if state.is_shutting_down() {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "shutting_down"})))
    } else {
        (StatusCode::OK, Json(json!({"status": "ok"})))
    }
}

async fn readyz(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    if state.ready() {
        (StatusCode::OK, Json(json!({"ready": true})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "ready": false,
                "leader": state.leader_held(),
                "schedulers_started": state.schedulers_started(),
                "shutting_down": state.is_shutting_down(),
            })),
        )
    }
}

async fn status(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    Json(json!({
        "uptime_secs": state.uptime_secs(),
        "leader": state.leader_held(),
        "shutting_down": state.is_shutting_down(),
        "schedulers": state.loop_statuses(),
        "held_locks": state.held_locks(),
        "active_products": state.active_products(),
    }))
}

async fn metrics(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    Json(json!({
        "uptime_seconds": state.uptime_secs(),
        "leader_lock_held": u8::from(state.leader_held()),
        "schedulers_active": state.schedulers_started(),
        "active_jobs": state.active_products().len(),
        "shutting_down": u8::from(state.is_shutting_down()),
    }))
}
