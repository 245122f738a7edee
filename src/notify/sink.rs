//! Visible notification stack
//!
//! Keeps the ordered list of visible notifications and their auto-dismiss
//! timers. Index 0 is the most recent notification.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{DoNotDisturb, NotificationRequest};

/// Unique identifier for a visible notification
pub type NotificationId = String;

/// Configuration for the notification sink
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// When false, no presentation surface is attached and notify is a no-op
    pub enabled: bool,
    /// Maximum number of notifications visible at once
    pub max_visible: usize,
    /// Display duration for requests without their own timeout
    pub default_timeout: Duration,
    /// Base path joined onto bare icon file names
    pub icon_base: String,
    /// Capacity of the event channel
    pub event_capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_visible: 3,
            default_timeout: Duration::from_secs(10),
            icon_base: "/static/icons".to_string(),
            event_capacity: 256,
        }
    }
}

/// A notification currently on screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    /// Resolved icon, `None` hides the icon
    pub icon: Option<String>,
    pub timeout_ms: u64,
    pub created_at: DateTime<Utc>,
    /// Position in the stack, 0 is the most recent
    pub stack_index: usize,
}

/// Why a notification left the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissReason {
    /// Display duration elapsed
    Timeout,
    /// Dismissed by user interaction
    User,
    /// Pushed out by a newer notification
    Evicted,
}

/// Change to the visible stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Shown { notification: Notification },
    Dismissed { id: NotificationId, reason: DismissReason },
    /// New stack order after any change, most recent first
    Restacked { order: Vec<NotificationId> },
}

struct Entry {
    notification: Notification,
    timer: Option<JoinHandle<()>>,
}

impl Entry {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Bounded stack of visible notifications
pub struct NotificationSink {
    stack: Arc<RwLock<Vec<Entry>>>,
    events: broadcast::Sender<SinkEvent>,
    dnd: DoNotDisturb,
    config: SinkConfig,
}

impl NotificationSink {
    /// Create a sink that consults `dnd` before showing anything
    pub fn new(config: SinkConfig, dnd: DoNotDisturb) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            stack: Arc::new(RwLock::new(Vec::new())),
            events,
            dnd,
            config,
        }
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn do_not_disturb(&self) -> &DoNotDisturb {
        &self.dnd
    }

    /// Show a notification.
    ///
    /// Returns `None` when suppressed by do-not-disturb or when the sink is
    /// disabled. Suppression is never an error.
    pub async fn notify(&self, request: NotificationRequest) -> Option<Notification> {
        if !self.config.enabled {
            return None;
        }

        if self.dnd.is_active() {
            tracing::debug!(title = %request.title, "Notification suppressed by do-not-disturb");
            return None;
        }

        let timeout = request.timeout.unwrap_or(self.config.default_timeout);
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            icon: request.icon.resolve(&self.config.icon_base),
            title: request.title,
            message: request.message,
            timeout_ms: timeout.as_millis() as u64,
            created_at: Utc::now(),
            stack_index: 0,
        };

        let mut evicted = Vec::new();
        let (shown, order) = {
            let mut stack = self.stack.write().await;

            // The timer cannot observe the stack before this lock is released
            let timer = {
                let handle = self.handle();
                let id = notification.id.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    handle.remove(&id, DismissReason::Timeout).await;
                })
            };
            stack.insert(
                0,
                Entry {
                    notification,
                    timer: Some(timer),
                },
            );

            while stack.len() > self.config.max_visible.max(1) {
                if let Some(mut old) = stack.pop() {
                    old.cancel_timer();
                    evicted.push(old.notification.id);
                }
            }

            restack(&mut stack);
            (stack[0].notification.clone(), current_order(&stack))
        };

        tracing::info!(
            id = %shown.id,
            title = %shown.title,
            message = %shown.message,
            "Notification shown"
        );

        let _ = self.events.send(SinkEvent::Shown {
            notification: shown.clone(),
        });
        for id in evicted {
            tracing::debug!(id = %id, "Notification evicted");
            let _ = self.events.send(SinkEvent::Dismissed {
                id,
                reason: DismissReason::Evicted,
            });
        }
        let _ = self.events.send(SinkEvent::Restacked { order });

        Some(shown)
    }

    /// Dismiss a notification on user interaction.
    ///
    /// Returns false if it is no longer visible.
    pub async fn dismiss(&self, id: &str) -> bool {
        self.handle().remove(id, DismissReason::User).await
    }

    /// Visible notifications, most recent first
    pub async fn visible(&self) -> Vec<Notification> {
        self.stack
            .read()
            .await
            .iter()
            .map(|e| e.notification.clone())
            .collect()
    }

    pub async fn visible_count(&self) -> usize {
        self.stack.read().await.len()
    }

    /// Receive every subsequent stack change
    pub fn subscribe(&self) -> broadcast::Receiver<SinkEvent> {
        self.events.subscribe()
    }

    /// Clone the shared parts for use in timer tasks
    fn handle(&self) -> StackHandle {
        StackHandle {
            stack: Arc::clone(&self.stack),
            events: self.events.clone(),
        }
    }
}

/// Reference to the stack internals for timers and dismissal
struct StackHandle {
    stack: Arc<RwLock<Vec<Entry>>>,
    events: broadcast::Sender<SinkEvent>,
}

impl StackHandle {
    async fn remove(&self, id: &str, reason: DismissReason) -> bool {
        let order = {
            let mut stack = self.stack.write().await;
            let Some(pos) = stack.iter().position(|e| e.notification.id == id) else {
                return false;
            };

            let mut entry = stack.remove(pos);
            if reason != DismissReason::Timeout {
                entry.cancel_timer();
            }
            restack(&mut stack);
            current_order(&stack)
        };

        tracing::debug!(id = %id, reason = ?reason, "Notification dismissed");

        let _ = self.events.send(SinkEvent::Dismissed {
            id: id.to_string(),
            reason,
        });
        let _ = self.events.send(SinkEvent::Restacked { order });
        true
    }
}

fn current_order(stack: &[Entry]) -> Vec<NotificationId> {
    stack.iter().map(|e| e.notification.id.clone()).collect()
}

fn restack(stack: &mut [Entry]) {
    for (i, entry) in stack.iter_mut().enumerate() {
        entry.notification.stack_index = i;
    }
}
