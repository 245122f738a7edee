//! Lookout CLI
//!
//! Command-line client for a running Lookout daemon:
//! - Check status and watcher health
//! - List, show and dismiss notifications
//! - Toggle do-not-disturb
//! - Generate a default config

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lookout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the Lookout notification daemon")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8086", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show daemon status
    Status,

    /// Show per-resource watcher status
    Watchers,

    /// List visible notifications
    List,

    /// Show a notification
    Notify {
        /// Title line
        title: String,
        /// Message body
        message: String,
        /// Icon file name or path
        #[arg(short, long)]
        icon: Option<String>,
        /// Avatar URL, takes precedence over the icon
        #[arg(short, long)]
        avatar: Option<String>,
        /// Display duration in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// Dismiss a visible notification
    Dismiss {
        /// Notification ID
        id: String,
    },

    /// Show or switch do-not-disturb
    Dnd {
        /// New state (omit to show the current one)
        state: Option<Switch>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: Value = resp.json().await?;

                    if cli.format == "json" {
                        println!("{}", serde_json::to_string_pretty(&health)?);
                        return Ok(());
                    }

                    println!(
                        "Lookout v{}",
                        health["version"].as_str().unwrap_or(env!("CARGO_PKG_VERSION"))
                    );
                    println!();
                    println!("Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!(
                        "Do-not-disturb: {}",
                        if health["do_not_disturb"].as_bool().unwrap_or(false) {
                            "on"
                        } else {
                            "off"
                        }
                    );
                    if let Some(visible) = health["visible_notifications"].as_u64() {
                        println!("Visible notifications: {}", visible);
                    }
                    if let Some(connections) = health["ws_connections"].as_u64() {
                        println!("Dashboard connections: {}", connections);
                    }

                    if let Some(failing) = health["failing_watchers"].as_array() {
                        if !failing.is_empty() {
                            let names: Vec<&str> = failing.iter().filter_map(|v| v.as_str()).collect();
                            println!();
                            println!("Failing watchers: {}", names.join(", "));
                        }
                    }

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("API returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to Lookout API at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the Lookout daemon is running:");
                    eprintln!("  cargo run --bin lookout");
                    std::process::exit(1);
                }
            }
        }

        Commands::Watchers => {
            let data = get_json(&client, &format!("{}/api/v1/watchers", cli.api_url)).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            if !data["started"].as_bool().unwrap_or(false) {
                println!("Watchers have not started yet.");
                println!();
            }

            println!(
                "{:<10} {:<8} {:<28} {:<10} {:<24} {}",
                "Resource", "Enabled", "Path", "Interval", "Last poll", "Outcome"
            );
            println!("{}", "-".repeat(100));

            for watcher in data["watchers"].as_array().into_iter().flatten() {
                let last_poll = watcher["last_poll"]
                    .as_str()
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "never".to_string());

                println!(
                    "{:<10} {:<8} {:<28} {:<10} {:<24} {}",
                    watcher["resource"].as_str().unwrap_or("?"),
                    if watcher["enabled"].as_bool().unwrap_or(false) { "yes" } else { "no" },
                    watcher["path"].as_str().unwrap_or(""),
                    format!("{}ms", watcher["interval_ms"].as_u64().unwrap_or(0)),
                    last_poll,
                    describe_outcome(watcher),
                );
            }
        }

        Commands::List => {
            let data = get_json(&client, &format!("{}/api/v1/notifications", cli.api_url)).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            let notifications = data["notifications"].as_array().cloned().unwrap_or_default();
            if notifications.is_empty() {
                println!("No visible notifications.");
                return Ok(());
            }

            println!("{:<38} {:<12} {}", "ID", "Title", "Message");
            println!("{}", "-".repeat(80));
            for n in notifications {
                println!(
                    "{:<38} {:<12} {}",
                    n["id"].as_str().unwrap_or(""),
                    n["title"].as_str().unwrap_or(""),
                    n["message"].as_str().unwrap_or(""),
                );
            }
        }

        Commands::Notify {
            title,
            message,
            icon,
            avatar,
            timeout_ms,
        } => {
            let body = serde_json::json!({
                "title": title,
                "message": message,
                "icon": icon,
                "avatar": avatar,
                "timeout_ms": timeout_ms,
            });

            let response = client
                .post(format!("{}/api/v1/notifications", cli.api_url))
                .json(&body)
                .send()
                .await
                .with_context(|| format!("Cannot connect to Lookout API at {}", cli.api_url))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                eprintln!("Failed ({}): {}", status, text);
                std::process::exit(1);
            }

            let data: Value = response.json().await?;
            match data["notification"]["id"].as_str() {
                Some(id) => println!("Shown {}", id),
                None => println!("Suppressed (do-not-disturb is on)"),
            }
        }

        Commands::Dismiss { id } => {
            let response = client
                .delete(format!("{}/api/v1/notifications/{}", cli.api_url, id))
                .send()
                .await
                .with_context(|| format!("Cannot connect to Lookout API at {}", cli.api_url))?;

            match response.status() {
                s if s.is_success() => println!("Dismissed {}", id),
                reqwest::StatusCode::NOT_FOUND => {
                    eprintln!("Notification {} is not visible", id);
                    std::process::exit(1);
                }
                s => bail!("API returned error: {}", s),
            }
        }

        Commands::Dnd { state } => {
            let url = format!("{}/api/v1/dnd", cli.api_url);
            let data = match state {
                None => get_json(&client, &url).await?,
                Some(switch) => {
                    let response = client
                        .put(&url)
                        .json(&serde_json::json!({ "active": matches!(switch, Switch::On) }))
                        .send()
                        .await
                        .with_context(|| format!("Cannot connect to Lookout API at {}", cli.api_url))?;
                    if !response.status().is_success() {
                        bail!("API returned error: {}", response.status());
                    }
                    response.json().await?
                }
            };

            let active = data["active"].as_bool().unwrap_or(false);
            println!("Do-not-disturb is {}", if active { "on" } else { "off" });
        }

        Commands::Config { output } => {
            let config = lookout::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Cannot reach {}", url))?;

    if !response.status().is_success() {
        bail!("API returned error: {}", response.status());
    }

    Ok(response.json().await?)
}

fn describe_outcome(watcher: &Value) -> String {
    let outcome = &watcher["last_outcome"];
    let text = match outcome["status"].as_str() {
        Some("initialized") => format!("baseline ({} entities)", outcome["entities"].as_u64().unwrap_or(0)),
        Some("compared") => format!("{} notifications", outcome["notifications"].as_u64().unwrap_or(0)),
        Some("no_data") => format!("no data: {}", outcome["error"].as_str().unwrap_or("unknown")),
        _ => "pending".to_string(),
    };

    match watcher["consecutive_failures"].as_u64() {
        Some(n) if n > 1 => format!("{} ({} failures in a row)", text, n),
        _ => text,
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
