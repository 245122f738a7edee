//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notify::SinkConfig;
use crate::watch::ResourceKind;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Panel backend serving the status endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout() -> u64 {
    3000
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Watcher supervisor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    /// Delay between start and the first polls
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,

    #[serde(default = "default_pinned_path")]
    pub pinned_friends_path: String,

    #[serde(default)]
    pub lighting: ResourceConfig,

    #[serde(default)]
    pub voice: ResourceConfig,

    #[serde(default)]
    pub printer: ResourceConfig,

    #[serde(default)]
    pub friends: ResourceConfig,
}

fn default_startup_delay() -> u64 {
    800
}

fn default_pinned_path() -> String {
    "/api/steam/friends/pinned".to_string()
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: default_startup_delay(),
            pinned_friends_path: default_pinned_path(),
            lighting: ResourceConfig::default(),
            voice: ResourceConfig::default(),
            printer: ResourceConfig::default(),
            friends: ResourceConfig::default(),
        }
    }
}

/// Per-resource overrides; unset fields use the resource's defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub path: Option<String>,

    pub interval_ms: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: None,
            interval_ms: None,
        }
    }
}

/// Effective polling schedule of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchedule {
    pub enabled: bool,
    pub path: String,
    pub interval: Duration,
}

/// Shortest accepted poll interval
const MIN_INTERVAL_MS: u64 = 100;

impl WatcherConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn resource(&self, kind: ResourceKind) -> &ResourceConfig {
        match kind {
            ResourceKind::Lighting => &self.lighting,
            ResourceKind::Voice => &self.voice,
            ResourceKind::Printer => &self.printer,
            ResourceKind::Friends => &self.friends,
        }
    }

    /// Resolve the schedule of `kind`, filling in its defaults
    pub fn schedule(&self, kind: ResourceKind) -> ResourceSchedule {
        let (path, interval_ms) = match kind {
            ResourceKind::Lighting => ("/api/hexa/status", 2000),
            ResourceKind::Voice => ("/api/discord/voice", 2000),
            ResourceKind::Printer => ("/api/p1s/status", 5000),
            ResourceKind::Friends => ("/api/steam/friends", 5000),
        };
        let overrides = self.resource(kind);

        ResourceSchedule {
            enabled: overrides.enabled,
            path: overrides.path.clone().unwrap_or_else(|| path.to_string()),
            interval: Duration::from_millis(overrides.interval_ms.unwrap_or(interval_ms).max(MIN_INTERVAL_MS)),
        }
    }
}

/// Notification stack configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// When false, notifications are dropped silently
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_max_visible")]
    pub max_visible: usize,

    #[serde(default = "default_notification_timeout")]
    pub default_timeout_ms: u64,

    #[serde(default = "default_icon_base")]
    pub icon_base: String,
}

fn default_max_visible() -> usize {
    3
}

fn default_notification_timeout() -> u64 {
    10_000
}

fn default_icon_base() -> String {
    "/static/icons".to_string()
}

impl NotificationsConfig {
    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            enabled: self.enabled,
            max_visible: self.max_visible.max(1),
            default_timeout: Duration::from_millis(self.default_timeout_ms),
            icon_base: self.icon_base.clone(),
            ..SinkConfig::default()
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_visible: default_max_visible(),
            default_timeout_ms: default_notification_timeout(),
            icon_base: default_icon_base(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8086
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("lookout").join("config.toml")),
            Some(PathBuf::from("/etc/lookout/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Source overrides
        if let Some(url) = lookup("LOOKOUT_SOURCE_URL") {
            self.source.base_url = url;
        }

        // API overrides
        if let Some(host) = lookup("LOOKOUT_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("LOOKOUT_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = lookup("LOOKOUT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOOKOUT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Lookout Configuration
#
# Environment variables override these settings:
# - LOOKOUT_SOURCE_URL
# - LOOKOUT_API_HOST
# - LOOKOUT_API_PORT
# - LOOKOUT_LOG_LEVEL
# - LOOKOUT_LOG_FORMAT

[source]
# Panel backend serving the status endpoints
base_url = "http://127.0.0.1:5000"

# Give up on a status request after this long (ms)
request_timeout_ms = 3000

[watcher]
# Delay between startup and the first polls (ms)
startup_delay_ms = 800

# Friends pinned for online/offline notifications, loaded once at startup
pinned_friends_path = "/api/steam/friends/pinned"

[watcher.lighting]
enabled = true
path = "/api/hexa/status"
interval_ms = 2000

[watcher.voice]
enabled = true
path = "/api/discord/voice"
interval_ms = 2000

[watcher.printer]
enabled = true
path = "/api/p1s/status"
interval_ms = 5000

[watcher.friends]
enabled = true
path = "/api/steam/friends"
interval_ms = 5000

[notifications]
# Set to false to drop all notifications
enabled = true

# Notifications visible at once; the oldest is evicted beyond this
max_visible = 3

# Display duration when a notification has none of its own (ms)
default_timeout_ms = 10000

# Base path for bundled icons
icon_base = "/static/icons"

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8086

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.watcher.startup_delay(), Duration::from_millis(800));
        assert_eq!(config.notifications.max_visible, 3);

        let lighting = config.watcher.schedule(ResourceKind::Lighting);
        assert!(lighting.enabled);
        assert_eq!(lighting.path, "/api/hexa/status");
        assert_eq!(lighting.interval, Duration::from_secs(2));

        let friends = config.watcher.schedule(ResourceKind::Friends);
        assert_eq!(friends.path, "/api/steam/friends");
        assert_eq!(friends.interval, Duration::from_secs(5));
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(
            r#"
[source]
base_url = "http://panel.local:8000"

[watcher.printer]
interval_ms = 10000

[watcher.voice]
enabled = false

[notifications]
max_visible = 5
"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.source.base_url, "http://panel.local:8000");
        assert_eq!(config.source.request_timeout_ms, 3000);

        let printer = config.watcher.schedule(ResourceKind::Printer);
        assert_eq!(printer.path, "/api/p1s/status");
        assert_eq!(printer.interval, Duration::from_secs(10));
        assert!(!config.watcher.schedule(ResourceKind::Voice).enabled);

        let sink = config.notifications.sink_config();
        assert_eq!(sink.max_visible, 5);
        assert_eq!(sink.default_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_interval_floor() {
        let file = write_config("[watcher.lighting]\ninterval_ms = 0\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.watcher.schedule(ResourceKind::Lighting).interval,
            Duration::from_millis(MIN_INTERVAL_MS)
        );
    }

    #[test]
    fn test_parse_error() {
        let file = write_config("[api]\nport = \"not a port\"\n");
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_generated_config_matches_defaults() {
        let file = write_config(&generate_default_config());
        let config = Config::load(file.path()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.source.base_url, defaults.source.base_url);
        assert_eq!(config.api.port, defaults.api.port);
        for kind in ResourceKind::ALL {
            assert_eq!(config.watcher.schedule(kind), defaults.watcher.schedule(kind));
        }
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LOOKOUT_SOURCE_URL", "http://10.0.0.2:5000"),
            ("LOOKOUT_API_PORT", "9000"),
            ("LOOKOUT_LOG_FORMAT", "json"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.source.base_url, "http://10.0.0.2:5000");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_bad_port_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "LOOKOUT_API_PORT").then(|| "eighty".to_string()));
        assert_eq!(config.api.port, 8086);
    }
}
