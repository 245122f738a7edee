//! # Lookout
//!
//! Status panel watcher. Periodically samples home and system status
//! endpoints (lighting, voice chat presence, 3D printer, friends list),
//! detects meaningful transitions and turns them into a small stack of
//! auto-dismissing notifications for the dashboard.
//!
//! ## Features
//!
//! - **Change detection**: per-resource rule tables over (previous, current) snapshots
//! - **Quiet start**: the first sample of every resource only sets the baseline
//! - **Bounded stack**: at most three visible notifications, oldest evicted first
//! - **Do-not-disturb**: nothing is shown while the panel screensaver is active
//! - **Real-time**: WebSocket push of every stack change
//!
//! ## Modules
//!
//! - [`watch`]: Status sources, diff engine, pollers and the watcher supervisor
//! - [`notify`]: Notification sink and do-not-disturb switch
//! - [`api`]: REST API server with Axum
//! - [`websocket`]: Push channel for dashboards
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lookout::notify::{DoNotDisturb, NotificationSink, SinkConfig};
//! use lookout::watch::{Differ, Lighting, Poller, HttpStatusSource};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sink = Arc::new(NotificationSink::new(SinkConfig::default(), DoNotDisturb::new()));
//!     let source = Arc::new(HttpStatusSource::new("http://127.0.0.1:5000", Duration::from_secs(3))?);
//!
//!     let mut lights = Poller::<Lighting>::new(source, "/api/hexa/status", Differ::default(), sink.clone());
//!
//!     // First poll records the baseline, later polls notify on changes
//!     lights.poll().await;
//!     tokio::time::sleep(Duration::from_secs(2)).await;
//!     lights.poll().await;
//!
//!     for notification in sink.visible().await {
//!         println!("{}: {}", notification.title, notification.message);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod notify;
pub mod watch;
pub mod websocket;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, AppState};

pub use config::{
    generate_default_config, ApiConfig, Config, ConfigError, LoggingConfig, NotificationsConfig,
    ResourceConfig, ResourceSchedule, SourceConfig, WatcherConfig,
};

pub use notify::{
    DismissReason, DoNotDisturb, IconSource, Notification, NotificationId, NotificationRequest,
    NotificationSink, SinkConfig, SinkEvent,
};

pub use watch::{
    FetchError, HttpStatusSource, PollOutcome, Poller, ResourceKind, StatusSource, WatcherStatus,
    WatcherSupervisor,
};

pub use websocket::{
    websocket_handler, ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent,
};
