//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::notify::{Notification, NotificationRequest};
use crate::watch::{ResourceKind, WatcherStatus};

// ============================================
// NOTIFICATION DTOs
// ============================================

/// Manual notification request
#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub title: String,
    pub message: String,
    /// Avatar URL, shown instead of any icon
    #[serde(default)]
    pub avatar: Option<String>,
    /// Icon file name or path
    #[serde(default)]
    pub icon: Option<String>,
    /// Icon used when neither avatar nor icon is set
    #[serde(default)]
    pub fallback_icon: Option<String>,
    /// Display duration, defaults to the configured timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl From<NotifyRequest> for NotificationRequest {
    fn from(req: NotifyRequest) -> Self {
        let mut request = NotificationRequest::new(req.title, req.message).avatar(req.avatar);
        request.icon.icon = req.icon;
        request.icon.fallback_icon = req.fallback_icon;
        request.timeout = req.timeout_ms.map(Duration::from_millis);
        request
    }
}

/// Manual notification response
#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    /// "shown" or "suppressed"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

/// Visible notification stack
#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    /// Most recent first
    pub notifications: Vec<Notification>,
    pub total: usize,
    pub max_visible: usize,
}

// ============================================
// DO-NOT-DISTURB DTOs
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DndState {
    pub active: bool,
}

// ============================================
// WATCHER DTOs
// ============================================

/// Watcher status list
#[derive(Debug, Serialize)]
pub struct WatcherListResponse {
    pub started: bool,
    pub watchers: Vec<WatcherStatus>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded, starting
    pub status: String,
    /// Watchers that have failed several polls in a row
    pub failing_watchers: Vec<ResourceKind>,
    pub visible_notifications: usize,
    pub do_not_disturb: bool,
    pub ws_connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
