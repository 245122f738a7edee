//! Lookout daemon
//!
//! Polls the panel's status endpoints, raises notifications on meaningful
//! changes and serves the notification stack over HTTP and WebSocket.
//!
//! Run with: cargo run --bin lookout -- --config config.toml
//!
//! Without `--config` the default locations are searched (see
//! [`Config::load_default`]). `RUST_LOG` overrides the configured log level.

use clap::Parser;
use lookout::api::{serve, AppState};
use lookout::config::{Config, LoggingConfig};
use lookout::notify::{DoNotDisturb, NotificationSink};
use lookout::watch::{HttpStatusSource, WatcherSupervisor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "lookout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Status panel watcher and notification service")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting Lookout v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(base_url = %config.source.base_url, "Watching panel backend");

    let sink = Arc::new(NotificationSink::new(
        config.notifications.sink_config(),
        DoNotDisturb::new(),
    ));
    if !config.notifications.enabled {
        tracing::info!("Notifications disabled, transitions will only be logged");
    }

    let source = Arc::new(HttpStatusSource::new(
        config.source.base_url.clone(),
        config.source.request_timeout(),
    )?);
    let supervisor = Arc::new(WatcherSupervisor::new(
        config.watcher.clone(),
        source,
        Arc::clone(&sink),
    ));

    let state = AppState::new(Arc::clone(&sink), Arc::clone(&supervisor), config.api.clone());
    let relay = state.ws_hub.relay_sink_events(sink.subscribe());

    supervisor.start();

    serve(state, &config.api).await?;

    supervisor.shutdown();
    relay.abort();
    tracing::info!("Lookout stopped");

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lookout={},tower_http=info", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
