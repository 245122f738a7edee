//! Notification Routes
//!
//! - GET /api/v1/notifications - Visible stack, most recent first
//! - POST /api/v1/notifications - Show a notification
//! - DELETE /api/v1/notifications/:id - Dismiss a notification

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{NotificationListResponse, NotifyRequest, NotifyResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// Longest accepted display duration
const MAX_TIMEOUT_MS: u64 = 60 * 60 * 1000;

/// GET /api/v1/notifications
pub async fn list_notifications(State(state): State<Arc<AppState>>) -> Json<NotificationListResponse> {
    let notifications = state.sink.visible().await;

    Json(NotificationListResponse {
        total: notifications.len(),
        notifications,
        max_visible: state.sink.config().max_visible,
    })
}

/// POST /api/v1/notifications
///
/// 201 with the notification when shown, 200 when suppressed.
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NotifyRequest>,
) -> ApiResult<(StatusCode, Json<NotifyResponse>)> {
    validate_notify_request(&req)?;

    let response = match state.sink.notify(req.into()).await {
        Some(notification) => (
            StatusCode::CREATED,
            Json(NotifyResponse {
                status: "shown".to_string(),
                notification: Some(notification),
            }),
        ),
        None => (
            StatusCode::OK,
            Json(NotifyResponse {
                status: "suppressed".to_string(),
                notification: None,
            }),
        ),
    };

    Ok(response)
}

/// DELETE /api/v1/notifications/:id
pub async fn dismiss_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.sink.dismiss(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Notification {} is not visible", id)))
    }
}

fn validate_notify_request(req: &NotifyRequest) -> ApiResult<()> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".into()));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::Validation("message must not be empty".into()));
    }
    if let Some(timeout) = req.timeout_ms {
        if timeout == 0 || timeout > MAX_TIMEOUT_MS {
            return Err(ApiError::Validation(format!(
                "timeout_ms must be between 1 and {}",
                MAX_TIMEOUT_MS
            )));
        }
    }
    Ok(())
}
