//! Lookout REST API
//!
//! HTTP API layer for Lookout, built with Axum.
//!
//! # Endpoints
//!
//! ## Notifications
//! - `GET /api/v1/notifications` - Visible stack, most recent first
//! - `POST /api/v1/notifications` - Show a notification
//! - `DELETE /api/v1/notifications/:id` - Dismiss a notification
//!
//! ## Do-not-disturb
//! - `GET /api/v1/dnd` - Current state
//! - `PUT /api/v1/dnd` - Switch on or off
//!
//! ## Watchers
//! - `GET /api/v1/watchers` - Per-resource watcher status
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /ws` - Notification push channel
//!
//! # Example
//!
//! ```rust,ignore
//! use lookout::api::{serve, AppState};
//! use lookout::config::Config;
//! use lookout::notify::{DoNotDisturb, NotificationSink};
//! use lookout::watch::{HttpStatusSource, WatcherSupervisor};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let sink = Arc::new(NotificationSink::new(config.notifications.sink_config(), DoNotDisturb::new()));
//!     let source = Arc::new(HttpStatusSource::new(&config.source.base_url, config.source.request_timeout())?);
//!     let supervisor = Arc::new(WatcherSupervisor::new(config.watcher.clone(), source, sink.clone()));
//!     supervisor.start();
//!
//!     let state = AppState::new(sink, supervisor, config.api.clone());
//!     serve(state, &config.api).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use crate::config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Notification routes
        .route(
            "/notifications",
            get(routes::notifications::list_notifications).post(routes::notifications::create_notification),
        )
        .route("/notifications/:id", delete(routes::notifications::dismiss_notification))
        // Do-not-disturb routes
        .route("/dnd", get(routes::dnd::get_dnd).put(routes::dnd::set_dnd))
        // Watcher routes
        .route("/watchers", get(routes::watchers::list_watchers));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Lookout API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Lookout API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
