//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! dashboards and the Lookout server.

use serde::{Deserialize, Serialize};

use crate::notify::{DismissReason, Notification, NotificationId, SinkEvent};

/// Topic carrying notification stack changes
pub const TOPIC_NOTIFICATIONS: &str = "notifications";
/// Topic carrying service-level events (do-not-disturb)
pub const TOPIC_SYSTEM: &str = "system";

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics for real-time updates
    Subscribe {
        /// Topics to subscribe to ("notifications", "system")
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe { topics: Vec<String> },
    /// The user clicked a notification away
    Dismiss { id: NotificationId },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full visible stack, most recent first
    Stack { notifications: Vec<Notification> },
    NotificationShown { notification: Notification },
    NotificationDismissed { id: NotificationId, reason: DismissReason },
    /// New stack order after a change
    StackChanged { order: Vec<NotificationId> },
    DoNotDisturb { active: bool },
    /// Subscription confirmed
    Subscribed { topics: Vec<String> },
    /// Unsubscription confirmed
    Unsubscribed { topics: Vec<String> },
    /// Pong response to ping
    Pong,
    Error { message: String },
    /// Connection established
    Connected { connection_id: String },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl WsEvent {
    /// Wrap a notification sink event
    pub fn sink(event: SinkEvent) -> Self {
        let message = match event {
            SinkEvent::Shown { notification } => ServerMessage::NotificationShown { notification },
            SinkEvent::Dismissed { id, reason } => ServerMessage::NotificationDismissed { id, reason },
            SinkEvent::Restacked { order } => ServerMessage::StackChanged { order },
        };

        Self {
            topic: TOPIC_NOTIFICATIONS.to_string(),
            message,
        }
    }

    /// Do-not-disturb switched on or off
    pub fn do_not_disturb(active: bool) -> Self {
        Self {
            topic: TOPIC_SYSTEM.to_string(),
            message: ServerMessage::DoNotDisturb { active },
        }
    }
}
