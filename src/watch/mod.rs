//! Status Watchers
//!
//! Periodically samples the panel's status endpoints, compares each sample
//! against the previous one and turns meaningful transitions into
//! notifications.
//!
//! ## Pipeline
//!
//! - [`StatusSource`] fetches a JSON document for one resource
//! - [`Resource::normalize`] turns it into an entity map
//! - [`Snapshot`] holds the last entity map per resource
//! - [`diff`] applies the resource's [`Rule`] table to (previous, current)
//! - [`Poller`] ties the above together and feeds the notification sink
//! - [`WatcherSupervisor`] runs one poller per resource on its own interval
//!
//! The first successful poll of a resource only establishes its baseline and
//! never notifies. Failed polls leave the baseline untouched.

mod poller;
mod resources;
mod rules;
mod snapshot;
mod source;
mod supervisor;

pub use poller::{PollOutcome, Poller};
pub use resources::{
    FriendState, Friends, LightState, Lighting, PinnedSet, Printer, PrinterState, VoiceKey,
    VoiceMember, VoicePresence,
};
pub use rules::{diff, Change, ChangeKind, Differ, Entities, Resource, Rule, Transition};
pub use snapshot::Snapshot;
pub use source::{load_pinned_set, FetchError, HttpStatusSource, StatusSource};
pub use supervisor::{LastOutcome, WatcherStatus, WatcherSupervisor};

use serde::{Deserialize, Serialize};
use std::fmt;

/// One externally polled subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Lighting,
    Voice,
    Printer,
    Friends,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Lighting,
        ResourceKind::Voice,
        ResourceKind::Printer,
        ResourceKind::Friends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Lighting => "lighting",
            ResourceKind::Voice => "voice",
            ResourceKind::Printer => "printer",
            ResourceKind::Friends => "friends",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
