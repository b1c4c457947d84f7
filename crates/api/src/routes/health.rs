//! Health check and metrics endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use telemetry::{health, metrics, HealthStatus, MetricsSnapshot};

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Full health check.
///
/// Answers 503 until the inference engine can serve predictions.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let report = health().report();
    let model_loaded = state.engine.is_ready();

    let status = if model_loaded {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let label = match (model_loaded, report.status) {
        (false, _) => HealthStatus::Unhealthy,
        (true, status) => status,
    };

    (
        status,
        Json(HealthResponse {
            status: format!("{:?}", label).to_lowercase(),
            model_loaded,
            active_sessions: state.sessions.len(),
        }),
    )
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /metrics - Counter snapshot.
pub async fn metrics_handler() -> Json<MetricsSnapshot> {
    Json(metrics().snapshot())
}
