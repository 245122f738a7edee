//! Resource Poller
//!
//! One poll cycle: fetch, normalize, diff against the snapshot, notify.

use std::sync::Arc;

use super::rules::{Differ, Resource};
use super::snapshot::Snapshot;
use super::source::{FetchError, StatusSource};
use crate::notify::NotificationSink;

/// Result of one poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// First good sample; baseline recorded, nothing announced
    Initialized { entities: usize },
    /// Compared against the baseline; `notifications` transitions fired
    Compared { notifications: usize },
    /// No usable data this cycle, baseline untouched
    NoData(FetchError),
}

/// Polls one resource and owns its snapshot
pub struct Poller<R: Resource> {
    source: Arc<dyn StatusSource>,
    path: String,
    snapshot: Snapshot<R>,
    differ: Differ<R>,
    sink: Arc<NotificationSink>,
}

impl<R: Resource> Poller<R> {
    pub fn new(
        source: Arc<dyn StatusSource>,
        path: impl Into<String>,
        differ: Differ<R>,
        sink: Arc<NotificationSink>,
    ) -> Self {
        Self {
            source,
            path: path.into(),
            snapshot: Snapshot::new(),
            differ,
            sink,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn snapshot(&self) -> &Snapshot<R> {
        &self.snapshot
    }

    /// Run one poll cycle
    pub async fn poll(&mut self) -> PollOutcome {
        let entities = match self.source.fetch(&self.path).await.and_then(R::normalize) {
            Ok(entities) => entities,
            Err(e) => {
                tracing::debug!(resource = %R::KIND, path = %self.path, error = %e, "Poll yielded no data");
                return PollOutcome::NoData(e);
            }
        };

        let count = entities.len();
        let Some(transitions) = self.snapshot.advance(entities, &self.differ) else {
            tracing::debug!(resource = %R::KIND, entities = count, "Baseline recorded");
            return PollOutcome::Initialized { entities: count };
        };

        let notifications = transitions.len();
        for transition in transitions {
            tracing::debug!(resource = %R::KIND, rule = transition.rule, "Transition fired");
            self.sink.notify(transition.notification).await;
        }

        PollOutcome::Compared { notifications }
    }
}
