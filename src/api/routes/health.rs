//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (watchers started)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// Consecutive failed polls after which a watcher counts as failing
const FAILING_AFTER: u32 = 3;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 once the watchers have been started.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.supervisor.is_started() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let failing_watchers: Vec<_> = state
        .supervisor
        .statuses()
        .await
        .into_iter()
        .filter(|w| w.enabled && w.consecutive_failures >= FAILING_AFTER)
        .map(|w| w.resource)
        .collect();

    // Failing status endpoints only mean missed notifications
    let status = if !state.supervisor.is_started() {
        "starting"
    } else if failing_watchers.is_empty() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        failing_watchers,
        visible_notifications: state.sink.visible_count().await,
        do_not_disturb: state.dnd.is_active(),
        ws_connections: state.ws_connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
