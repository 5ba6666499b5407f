use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let store_healthy = state.store().get_learner_state("__health_check__").is_ok();
    let store_latency_us = start.elapsed().as_micros() as u64;

    Json(serde_json::json!({
        "status": if store_healthy { "ok" } else { "degraded" },
        "uptimeSecs": state.uptime_secs(),
        "store": {
            "healthy": store_healthy,
            "latencyUs": store_latency_us,
        },
        "activeLearnerLocks": state.engine().locked_learners(),
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Ready once the question corpus can be served.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine().corpus() {
        Ok(corpus) => (
            StatusCode::OK,
            Json(serde_json::json!({ "ready": true, "questions": corpus.len() })),
        ),
        Err(error) => {
            tracing::warn!(error = %error, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "ready": false, "questions": 0 })),
            )
        }
    }
}
