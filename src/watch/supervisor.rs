//! Watcher Supervisor
//!
//! Owns the lifecycle of the resource pollers: one start per process, a short
//! startup delay, the pinned-set load, then one interval loop per resource.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::poller::{PollOutcome, Poller};
use super::resources::{Friends, Lighting, PinnedSet, Printer, VoicePresence};
use super::rules::{Differ, Resource};
use super::source::{load_pinned_set, StatusSource};
use super::ResourceKind;
use crate::config::WatcherConfig;
use crate::notify::NotificationSink;

/// Outcome of the most recent poll, as reported over the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LastOutcome {
    Initialized { entities: usize },
    Compared { notifications: usize },
    NoData { error: String },
}

impl From<&PollOutcome> for LastOutcome {
    fn from(outcome: &PollOutcome) -> Self {
        match outcome {
            PollOutcome::Initialized { entities } => LastOutcome::Initialized { entities: *entities },
            PollOutcome::Compared { notifications } => LastOutcome::Compared {
                notifications: *notifications,
            },
            PollOutcome::NoData(e) => LastOutcome::NoData { error: e.to_string() },
        }
    }
}

/// Current status of one resource watcher
#[derive(Debug, Clone, Serialize)]
pub struct WatcherStatus {
    pub resource: ResourceKind,
    pub enabled: bool,
    pub path: String,
    pub interval_ms: u64,
    /// A baseline snapshot exists
    pub initialized: bool,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_outcome: Option<LastOutcome>,
    pub consecutive_failures: u32,
    pub notifications_emitted: u64,
}

/// Runs every enabled resource poller on its own interval
pub struct WatcherSupervisor {
    config: WatcherConfig,
    source: Arc<dyn StatusSource>,
    sink: Arc<NotificationSink>,
    started: AtomicBool,
    /// Set by `shutdown`, only changed while `tasks` is locked
    stopped: AtomicBool,
    status: Arc<RwLock<BTreeMap<ResourceKind, WatcherStatus>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WatcherSupervisor {
    pub fn new(config: WatcherConfig, source: Arc<dyn StatusSource>, sink: Arc<NotificationSink>) -> Self {
        let status = ResourceKind::ALL
            .into_iter()
            .map(|kind| {
                let schedule = config.schedule(kind);
                (
                    kind,
                    WatcherStatus {
                        resource: kind,
                        enabled: schedule.enabled,
                        path: schedule.path,
                        interval_ms: schedule.interval.as_millis() as u64,
                        initialized: false,
                        last_poll: None,
                        last_outcome: None,
                        consecutive_failures: 0,
                        notifications_emitted: 0,
                    },
                )
            })
            .collect();

        Self {
            config,
            source,
            sink,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            status: Arc::new(RwLock::new(status)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start watching. Only the first call has any effect.
    ///
    /// Returns true if this call started the watchers.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Watchers already started");
            return false;
        }

        let supervisor = Arc::clone(self);
        let bootstrap = tokio::spawn(async move { supervisor.bootstrap().await });
        self.track(bootstrap);

        tracing::info!(
            delay_ms = self.config.startup_delay_ms,
            "Watchers starting"
        );
        true
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Status of every resource watcher, in resource order
    pub async fn statuses(&self) -> Vec<WatcherStatus> {
        self.status.read().await.values().cloned().collect()
    }

    pub async fn status(&self, kind: ResourceKind) -> Option<WatcherStatus> {
        self.status.read().await.get(&kind).cloned()
    }

    /// Abort all watcher tasks. The supervisor cannot be started again.
    pub fn shutdown(&self) {
        let tasks = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            self.stopped.store(true, Ordering::SeqCst);
            std::mem::take(&mut *tasks)
        };
        if tasks.is_empty() {
            return;
        }

        for task in &tasks {
            task.abort();
        }
        tracing::info!(tasks = tasks.len(), "Watchers stopped");
    }

    /// Keep a task for shutdown; after shutdown it is aborted right away
    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if self.stopped.load(Ordering::SeqCst) {
            task.abort();
            tracing::debug!("Watcher task spawned after shutdown, aborted");
            return;
        }
        tasks.push(task);
    }

    async fn bootstrap(self: Arc<Self>) {
        tokio::time::sleep(self.config.startup_delay()).await;

        let pinned = if self.config.schedule(ResourceKind::Friends).enabled {
            self.load_pinned().await
        } else {
            PinnedSet::default()
        };

        for kind in ResourceKind::ALL {
            let schedule = self.config.schedule(kind);
            if !schedule.enabled {
                tracing::info!(resource = %kind, "Watcher disabled");
                continue;
            }

            let source = Arc::clone(&self.source);
            let sink = Arc::clone(&self.sink);
            let path = schedule.path;
            let task = match kind {
                ResourceKind::Lighting => {
                    self.spawn_watcher(Poller::<Lighting>::new(source, path, Differ::default(), sink), schedule.interval)
                }
                ResourceKind::Voice => self.spawn_watcher(
                    Poller::<VoicePresence>::new(source, path, Differ::default(), sink),
                    schedule.interval,
                ),
                ResourceKind::Printer => {
                    self.spawn_watcher(Poller::<Printer>::new(source, path, Differ::default(), sink), schedule.interval)
                }
                ResourceKind::Friends => self.spawn_watcher(
                    Poller::<Friends>::new(source, path, Differ::new(pinned.clone()), sink),
                    schedule.interval,
                ),
            };
            self.track(task);

            tracing::info!(
                resource = %kind,
                interval_ms = schedule.interval.as_millis() as u64,
                "Watcher started"
            );
        }
    }

    /// Load the pinned set, falling back to an empty set
    async fn load_pinned(&self) -> PinnedSet {
        match load_pinned_set(self.source.as_ref(), &self.config.pinned_friends_path).await {
            Ok(pinned) => {
                tracing::info!(pinned = pinned.len(), "Loaded pinned friends");
                pinned
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load pinned friends, online notifications disabled");
                PinnedSet::default()
            }
        }
    }

    fn spawn_watcher<R: Resource>(self: &Arc<Self>, poller: Poller<R>, interval: Duration) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move { supervisor.run(poller, interval).await })
    }

    async fn run<R: Resource>(&self, mut poller: Poller<R>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // A slow fetch pushes the schedule back instead of bunching polls
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // The first tick completes immediately
            ticker.tick().await;
            let outcome = poller.poll().await;
            self.record(R::KIND, &outcome).await;
        }
    }

    async fn record(&self, kind: ResourceKind, outcome: &PollOutcome) {
        let mut status = self.status.write().await;
        let Some(entry) = status.get_mut(&kind) else {
            return;
        };

        entry.last_poll = Some(Utc::now());
        entry.last_outcome = Some(outcome.into());

        match outcome {
            PollOutcome::NoData(e) => {
                entry.consecutive_failures += 1;
                if entry.consecutive_failures == 1 {
                    tracing::warn!(resource = %kind, error = %e, "Status poll failed");
                }
            }
            PollOutcome::Initialized { .. } | PollOutcome::Compared { .. } => {
                if entry.consecutive_failures > 0 {
                    tracing::info!(
                        resource = %kind,
                        failures = entry.consecutive_failures,
                        "Status poll recovered"
                    );
                }
                entry.consecutive_failures = 0;
                entry.initialized = true;

                if let PollOutcome::Compared { notifications } = outcome {
                    entry.notifications_emitted += *notifications as u64;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{DoNotDisturb, SinkConfig};
    use crate::watch::FetchError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};

    /// Per-path canned responses; the last response of a path repeats
    #[derive(Default)]
    struct FakeBackend {
        responses: Mutex<HashMap<String, VecDeque<Result<Value, FetchError>>>>,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl FakeBackend {
        fn respond(self, path: &str, responses: Vec<Result<Value, FetchError>>) -> Self {
            self.responses.lock().unwrap().insert(path.to_string(), responses.into());
            self
        }

        fn calls(&self, path: &str) -> usize {
            self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl StatusSource for FakeBackend {
        async fn fetch(&self, path: &str) -> Result<Value, FetchError> {
            *self.calls.lock().unwrap().entry(path.to_string()).or_default() += 1;

            let mut responses = self.responses.lock().unwrap();
            let Some(queue) = responses.get_mut(path) else {
                return Err(FetchError::Status(404));
            };
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap_or(Err(FetchError::Status(404)))
            }
        }
    }

    fn backend() -> FakeBackend {
        FakeBackend::default()
            .respond("/api/hexa/status", vec![Ok(json!({"power": "off"}))])
            .respond("/api/discord/voice", vec![Ok(json!({}))])
            .respond("/api/p1s/status", vec![Ok(json!({"state": "Idle"}))])
            .respond("/api/steam/friends", vec![Ok(json!([]))])
            .respond("/api/steam/friends/pinned", vec![Ok(json!({"slot1": "765"}))])
    }

    fn supervisor(
        config: WatcherConfig,
        backend: Arc<FakeBackend>,
    ) -> (Arc<WatcherSupervisor>, Arc<NotificationSink>) {
        let sink = Arc::new(NotificationSink::new(SinkConfig::default(), DoNotDisturb::new()));
        let supervisor = Arc::new(WatcherSupervisor::new(config, backend, sink.clone()));
        (supervisor, sink)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let backend = Arc::new(backend());
        let (supervisor, _) = supervisor(WatcherConfig::default(), backend.clone());

        assert!(!supervisor.is_started());
        assert!(supervisor.start());
        assert!(!supervisor.start());
        assert!(supervisor.is_started());

        // Nothing happens during the startup delay
        advance(700).await;
        assert_eq!(backend.calls("/api/hexa/status"), 0);

        // One immediate poll per resource
        advance(200).await;
        assert_eq!(backend.calls("/api/steam/friends/pinned"), 1);
        assert_eq!(backend.calls("/api/hexa/status"), 1);
        assert_eq!(backend.calls("/api/discord/voice"), 1);
        assert_eq!(backend.calls("/api/p1s/status"), 1);
        assert_eq!(backend.calls("/api/steam/friends"), 1);

        // Each resource then runs on its own interval
        advance(2000).await;
        assert_eq!(backend.calls("/api/hexa/status"), 2);
        assert_eq!(backend.calls("/api/discord/voice"), 2);
        assert_eq!(backend.calls("/api/p1s/status"), 1);

        advance(3000).await;
        assert_eq!(backend.calls("/api/hexa/status"), 3);
        assert_eq!(backend.calls("/api/p1s/status"), 2);
        assert_eq!(backend.calls("/api/steam/friends"), 2);

        // The pinned set is never reloaded
        assert_eq!(backend.calls("/api/steam/friends/pinned"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_tracks_outcomes() {
        let backend = Arc::new(backend().respond(
            "/api/hexa/status",
            vec![
                Ok(json!({"power": "off"})),
                Err(FetchError::Status(503)),
                Err(FetchError::Transport("timed out".into())),
                Ok(json!({"power": "on"})),
            ],
        ));
        let (supervisor, sink) = supervisor(WatcherConfig::default(), backend);
        supervisor.start();

        advance(900).await;
        let lighting = supervisor.status(ResourceKind::Lighting).await.unwrap();
        assert!(lighting.initialized);
        assert_eq!(lighting.last_outcome, Some(LastOutcome::Initialized { entities: 1 }));

        advance(4000).await;
        let lighting = supervisor.status(ResourceKind::Lighting).await.unwrap();
        assert_eq!(lighting.consecutive_failures, 2);
        assert!(matches!(lighting.last_outcome, Some(LastOutcome::NoData { .. })));

        advance(2000).await;
        let lighting = supervisor.status(ResourceKind::Lighting).await.unwrap();
        assert_eq!(lighting.consecutive_failures, 0);
        assert_eq!(lighting.notifications_emitted, 1);
        assert_eq!(sink.visible().await[0].message, "Lights were turned on");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pinned_friend_online() {
        let backend = Arc::new(backend().respond(
            "/api/steam/friends",
            vec![
                Ok(json!([{"steamid": "765", "name": "alice", "status": "offline"}])),
                Ok(json!([{"steamid": "765", "name": "alice", "status": "online"}])),
            ],
        ));
        let (supervisor, sink) = supervisor(WatcherConfig::default(), backend);
        supervisor.start();

        advance(900 + 5000).await;
        let visible = sink.visible().await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].message, "alice is now online");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pinned_load_failure_is_not_fatal() {
        let backend = Arc::new(backend().respond(
            "/api/steam/friends/pinned",
            vec![Err(FetchError::Status(500))],
        ));
        let (supervisor, _) = supervisor(WatcherConfig::default(), backend.clone());
        supervisor.start();

        advance(900).await;
        assert_eq!(backend.calls("/api/steam/friends"), 1);
        let friends = supervisor.status(ResourceKind::Friends).await.unwrap();
        assert!(friends.initialized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_resource_not_polled() {
        let mut config = WatcherConfig::default();
        config.printer.enabled = false;
        config.friends.enabled = false;

        let backend = Arc::new(backend());
        let (supervisor, _) = supervisor(config, backend.clone());
        supervisor.start();

        advance(6000).await;
        assert_eq!(backend.calls("/api/p1s/status"), 0);
        assert_eq!(backend.calls("/api/steam/friends"), 0);
        assert_eq!(backend.calls("/api/steam/friends/pinned"), 0);
        assert!(backend.calls("/api/hexa/status") > 0);

        let printer = supervisor.status(ResourceKind::Printer).await.unwrap();
        assert!(!printer.enabled);
        assert!(printer.last_poll.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_polling() {
        let backend = Arc::new(backend());
        let (supervisor, _) = supervisor(WatcherConfig::default(), backend.clone());
        supervisor.start();

        advance(900).await;
        supervisor.shutdown();
        let polled = backend.calls("/api/hexa/status");

        advance(10_000).await;
        assert_eq!(backend.calls("/api/hexa/status"), polled);
        assert!(!supervisor.start());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_spawned_after_shutdown_never_polls() {
        let backend = Arc::new(backend());
        let (supervisor, sink) = supervisor(WatcherConfig::default(), backend.clone());
        supervisor.shutdown();

        // A bootstrap still in its spawn loop hands over a watcher late
        let poller = Poller::<Lighting>::new(backend.clone(), "/api/hexa/status", Differ::default(), sink);
        let task = supervisor.spawn_watcher(poller, Duration::from_secs(2));
        supervisor.track(task);

        advance(10_000).await;
        assert_eq!(backend.calls("/api/hexa/status"), 0);
        assert!(supervisor.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statuses_listed_in_order() {
        let (supervisor, _) = supervisor(WatcherConfig::default(), Arc::new(backend()));
        let kinds: Vec<_> = supervisor.statuses().await.into_iter().map(|s| s.resource).collect();
        assert_eq!(kinds, ResourceKind::ALL.to_vec());
    }
}
