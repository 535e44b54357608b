//! Operational HTTP endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use herald_common::{LivenessMonitor, Metrics, MetricsSnapshot};
use serde_json::{Value, json};

/// State shared by the operational endpoints.
#[derive(Clone)]
pub struct OpsState {
    pub liveness: Arc<LivenessMonitor>,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: OpsState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// `200` while healthy or dying, `500` once dead.
async fn health(State(state): State<OpsState>) -> (StatusCode, Json<Value>) {
    let health = state.liveness.check();
    let status = if health.is_alive() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "status": health })))
}

async fn metrics(State(state): State<OpsState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
