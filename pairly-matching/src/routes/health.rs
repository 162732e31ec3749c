use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pairly_shared::{HealthCheck, HealthResponse, HealthStatus};
use std::sync::Arc;

use crate::store::ProfileStore;
use crate::AppState;

/// Store reachability decides liveness; embeddings and events only degrade.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let mut checks = Vec::with_capacity(3);

    checks.push(match state.matching.store().ping().await {
        Ok(()) => HealthCheck::healthy("store"),
        Err(e) => HealthCheck::failing("store", HealthStatus::Unhealthy, e.to_string()),
    });

    checks.push(if state.matching.embeddings_enabled() {
        HealthCheck::healthy("embeddings")
    } else {
        HealthCheck::failing("embeddings", HealthStatus::Degraded, "provider disabled, ranking by filter order")
    });

    if let Some(rabbitmq) = &state.rabbitmq {
        checks.push(if rabbitmq.is_connected() {
            HealthCheck::healthy("rabbitmq")
        } else {
            HealthCheck::failing("rabbitmq", HealthStatus::Degraded, "channel closed")
        });
    }

    let response = HealthResponse::healthy("pairly-matching", env!("CARGO_PKG_VERSION"))
        .with_checks(checks);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Prometheus text format; empty when no recorder is installed.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
