//! WebSocket Connection Hub
//!
//! Manages all WebSocket connections, subscriptions, and message broadcasting.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::messages::{ServerMessage, WsEvent, TOPIC_NOTIFICATIONS, TOPIC_SYSTEM};
use crate::notify::SinkEvent;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Manages all WebSocket connections and subscriptions
pub struct ConnectionHub {
    /// Active connections: ConnectionId → ConnectionHandle
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Topic subscriptions: Topic → Set of ConnectionIds
    subscriptions: RwLock<HashMap<String, HashSet<ConnectionId>>>,
    config: HubConfig,
}

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { max_connections: 64 }
    }
}

/// Handle for sending messages to a specific connection
pub struct ConnectionHandle {
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    /// Topics this connection is subscribed to
    pub subscriptions: HashSet<String>,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a new WebSocket connection
    ///
    /// New connections start subscribed to the notifications topic, so no
    /// stack change is missed between the greeting and a first `subscribe`.
    /// Returns the connection ID on success, or an error if the connection
    /// limit has been reached.
    pub async fn register(&self, sender: mpsc::UnboundedSender<ServerMessage>) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        self.subscriptions
            .write()
            .await
            .entry(TOPIC_NOTIFICATIONS.to_string())
            .or_default()
            .insert(id.clone());
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                subscriptions: HashSet::from([TOPIC_NOTIFICATIONS.to_string()]),
            },
        );

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and clean up its subscriptions
    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let mut subs = self.subscriptions.write().await;
            for topic in handle.subscriptions {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
            }
        }

        tracing::info!(connection_id = %id, "WebSocket disconnected");
    }

    /// Subscribe a connection to topics; unknown topics are skipped
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            if !is_valid_topic(&topic) {
                tracing::warn!(topic = %topic, "Invalid topic ignored");
                continue;
            }

            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone()).or_default().insert(id.to_string());
            subscribed.push(topic);
        }

        tracing::debug!(connection_id = %id, topics = ?subscribed, "Subscribed to topics");
        Ok(subscribed)
    }

    /// Unsubscribe a connection from topics
    pub async fn unsubscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut unsubscribed = Vec::new();

        for topic in topics {
            if handle.subscriptions.remove(&topic) {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
                unsubscribed.push(topic);
            }
        }

        tracing::debug!(connection_id = %id, topics = ?unsubscribed, "Unsubscribed from topics");
        Ok(unsubscribed)
    }

    /// Send an event to every subscriber of its topic.
    ///
    /// Events published from one task reach each connection in order.
    pub async fn publish(&self, event: WsEvent) {
        // Same lock order as subscribe: connections, then subscriptions
        let connections = self.connections.read().await;
        let subs = self.subscriptions.read().await;
        let Some(subscriber_ids) = subs.get(&event.topic) else {
            return;
        };

        let mut sent_count = 0;
        for id in subscriber_ids {
            if let Some(handle) = connections.get(id) {
                if handle.sender.send(event.message.clone()).is_ok() {
                    sent_count += 1;
                }
            }
        }

        if sent_count > 0 {
            tracing::trace!(topic = %event.topic, subscribers = sent_count, "Broadcast event");
        }
    }

    /// Send a message directly to a specific connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;

        handle.sender.send(message).map_err(|_| HubError::SendFailed)
    }

    /// Relay notification sink events to subscribers until the sink is gone
    pub fn relay_sink_events(self: &Arc<Self>, mut events: broadcast::Receiver<SinkEvent>) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => hub.publish(WsEvent::sink(event)).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "WebSocket relay lagged behind notification events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

fn is_valid_topic(topic: &str) -> bool {
    topic == TOPIC_NOTIFICATIONS || topic == TOPIC_SYSTEM
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{DoNotDisturb, NotificationRequest, NotificationSink, SinkConfig};

    #[test]
    fn test_valid_topics() {
        assert!(is_valid_topic("notifications"));
        assert!(is_valid_topic("system"));

        assert!(!is_valid_topic("metrics.*"));
        assert!(!is_valid_topic(""));
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(hub.subscription_count("notifications").await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(hub.subscription_count("notifications").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_connection_receives_notifications_without_subscribing() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let sink = NotificationSink::new(SinkConfig::default(), DoNotDisturb::new());
        let relay = hub.relay_sink_events(sink.subscribe());

        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register(tx).await.unwrap();

        sink.notify(NotificationRequest::new("Test", "one")).await.unwrap();

        match rx.recv().await.unwrap() {
            ServerMessage::NotificationShown { notification } => assert_eq!(notification.message, "one"),
            other => panic!("unexpected message {:?}", other),
        }

        relay.abort();
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        let subscribed = hub
            .subscribe(&id, vec!["notifications".to_string(), "bogus".to_string()])
            .await
            .unwrap();
        assert_eq!(subscribed, vec!["notifications"]);
        assert_eq!(hub.subscription_count("notifications").await, 1);

        let unsubscribed = hub
            .unsubscribe(&id, vec!["notifications".to_string()])
            .await
            .unwrap();
        assert_eq!(unsubscribed, vec!["notifications"]);
        assert_eq!(hub.subscription_count("notifications").await, 0);

        hub.unregister(&id).await;
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig { max_connections: 2 });

        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();
        let (tx3, _) = mpsc::unbounded_channel();

        hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();
        let result = hub.register(tx3).await;

        assert!(matches!(result, Err(HubError::TooManyConnections(2))));
    }

    #[tokio::test]
    async fn test_publish_to_topic_subscribers() {
        let hub = ConnectionHub::new(HubConfig::default());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = hub.register(tx1).await.unwrap();
        let id2 = hub.register(tx2).await.unwrap();

        hub.subscribe(&id1, vec!["system".to_string()]).await.unwrap();
        hub.subscribe(&id2, vec!["notifications".to_string()]).await.unwrap();

        hub.publish(WsEvent::do_not_disturb(true)).await;

        assert!(matches!(rx1.try_recv(), Ok(ServerMessage::DoNotDisturb { active: true })));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_preserves_order() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let sink = NotificationSink::new(
            SinkConfig {
                max_visible: 1,
                ..Default::default()
            },
            DoNotDisturb::new(),
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();
        hub.subscribe(&id, vec!["notifications".to_string()]).await.unwrap();
        let relay = hub.relay_sink_events(sink.subscribe());

        sink.notify(NotificationRequest::new("Test", "one")).await.unwrap();
        sink.notify(NotificationRequest::new("Test", "two")).await.unwrap();

        let mut kinds = Vec::new();
        while kinds.len() < 5 {
            match rx.recv().await.unwrap() {
                ServerMessage::NotificationShown { .. } => kinds.push("shown"),
                ServerMessage::NotificationDismissed { .. } => kinds.push("dismissed"),
                ServerMessage::StackChanged { .. } => kinds.push("restacked"),
                other => panic!("unexpected message {:?}", other),
            }
        }
        assert_eq!(kinds, vec!["shown", "restacked", "shown", "dismissed", "restacked"]);

        relay.abort();
    }
}
