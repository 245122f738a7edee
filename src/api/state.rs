//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ApiConfig;
use crate::notify::{DoNotDisturb, NotificationSink};
use crate::watch::WatcherSupervisor;
use crate::websocket::{ConnectionHub, HubConfig};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Visible notification stack
    pub sink: Arc<NotificationSink>,
    /// Do-not-disturb switch consulted by the sink
    pub dnd: DoNotDisturb,
    /// Resource watchers, for status reporting
    pub supervisor: Arc<WatcherSupervisor>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// WebSocket connection hub for push updates
    pub ws_hub: Arc<ConnectionHub>,
}

impl AppState {
    pub fn new(sink: Arc<NotificationSink>, supervisor: Arc<WatcherSupervisor>, config: ApiConfig) -> Self {
        Self::with_ws_config(sink, supervisor, config, HubConfig::default())
    }

    /// Create AppState with custom WebSocket hub configuration
    pub fn with_ws_config(
        sink: Arc<NotificationSink>,
        supervisor: Arc<WatcherSupervisor>,
        config: ApiConfig,
        hub_config: HubConfig,
    ) -> Self {
        Self {
            dnd: sink.do_not_disturb().clone(),
            sink,
            supervisor,
            config: Arc::new(config),
            start_time: Instant::now(),
            ws_hub: Arc::new(ConnectionHub::new(hub_config)),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}
