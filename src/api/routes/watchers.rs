//! Watcher Routes
//!
//! - GET /api/v1/watchers - Status of every resource watcher

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::WatcherListResponse;
use crate::api::state::AppState;

/// GET /api/v1/watchers
pub async fn list_watchers(State(state): State<Arc<AppState>>) -> Json<WatcherListResponse> {
    Json(WatcherListResponse {
        started: state.supervisor.is_started(),
        watchers: state.supervisor.statuses().await,
    })
}
