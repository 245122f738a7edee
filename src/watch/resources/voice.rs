//! Voice channel presence
//!
//! The endpoint groups members by server and channel:
//! `{server: {channel: [{name, avatar, streaming, video, ...}]}}`.
//! Servers are flattened away; a member is identified by channel and name.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::{always, parse_object, text, truthy};
use crate::notify::NotificationRequest;
use crate::watch::rules::{Change, ChangeKind, Entities, Resource, Rule};
use crate::watch::source::FetchError;
use crate::watch::ResourceKind;

/// Members of all voice channels
pub struct VoicePresence;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceKey {
    pub channel: String,
    pub user: String,
}

impl VoiceKey {
    pub fn new(channel: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
        }
    }
}

impl fmt::Display for VoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.channel)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceMember {
    pub avatar: Option<String>,
    pub streaming: bool,
    pub video: bool,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    avatar: Option<Value>,
    #[serde(default)]
    streaming: Option<Value>,
    #[serde(default)]
    video: Option<Value>,
}

/// Members stay raw so one odd entry cannot reject the whole channel
type RawVoiceSnapshot = BTreeMap<String, BTreeMap<String, Vec<Value>>>;

const DISCORD: &str = "Discord";

fn member_notification(change: &Change<'_, VoicePresence>, message: String, fallback: &str) -> NotificationRequest {
    NotificationRequest::new(DISCORD, message)
        .avatar(change.latest().avatar.clone())
        .fallback_icon(fallback)
}

fn joined(change: &Change<'_, VoicePresence>) -> NotificationRequest {
    let key = change.key();
    member_notification(change, format!("{} joined {}", key.user, key.channel), "discord.svg")
}

fn left(change: &Change<'_, VoicePresence>) -> NotificationRequest {
    let key = change.key();
    member_notification(change, format!("{} left {}", key.user, key.channel), "discord.svg")
}

fn started_streaming(change: &Change<'_, VoicePresence>, _: &()) -> bool {
    change.both().map_or(false, |(p, c)| !p.streaming && c.streaming)
}

fn stopped_streaming(change: &Change<'_, VoicePresence>, _: &()) -> bool {
    change.both().map_or(false, |(p, c)| p.streaming && !c.streaming)
}

fn camera_on(change: &Change<'_, VoicePresence>, _: &()) -> bool {
    change.both().map_or(false, |(p, c)| !p.video && c.video)
}

fn camera_off(change: &Change<'_, VoicePresence>, _: &()) -> bool {
    change.both().map_or(false, |(p, c)| p.video && !c.video)
}

fn streaming_started_message(change: &Change<'_, VoicePresence>) -> NotificationRequest {
    let key = change.key();
    member_notification(
        change,
        format!("{} started streaming in {}", key.user, key.channel),
        "screen_share.svg",
    )
}

fn streaming_stopped_message(change: &Change<'_, VoicePresence>) -> NotificationRequest {
    let key = change.key();
    member_notification(
        change,
        format!("{} stopped streaming in {}", key.user, key.channel),
        "stop_screen_share.svg",
    )
}

fn camera_on_message(change: &Change<'_, VoicePresence>) -> NotificationRequest {
    let key = change.key();
    member_notification(
        change,
        format!("{} turned on camera in {}", key.user, key.channel),
        "video_camera_person.svg",
    )
}

fn camera_off_message(change: &Change<'_, VoicePresence>) -> NotificationRequest {
    let key = change.key();
    member_notification(
        change,
        format!("{} turned off camera in {}", key.user, key.channel),
        "video_camera_person_off.svg",
    )
}

static VOICE_RULES: [Rule<VoicePresence>; 6] = [
    Rule {
        name: "joined",
        on: ChangeKind::Appeared,
        fires: always::<VoicePresence>,
        render: joined,
    },
    Rule {
        name: "left",
        on: ChangeKind::Vanished,
        fires: always::<VoicePresence>,
        render: left,
    },
    Rule {
        name: "started_streaming",
        on: ChangeKind::Persisted,
        fires: started_streaming,
        render: streaming_started_message,
    },
    Rule {
        name: "stopped_streaming",
        on: ChangeKind::Persisted,
        fires: stopped_streaming,
        render: streaming_stopped_message,
    },
    Rule {
        name: "camera_on",
        on: ChangeKind::Persisted,
        fires: camera_on,
        render: camera_on_message,
    },
    Rule {
        name: "camera_off",
        on: ChangeKind::Persisted,
        fires: camera_off,
        render: camera_off_message,
    },
];

impl Resource for VoicePresence {
    type Key = VoiceKey;
    type State = VoiceMember;
    type Context = ();

    const KIND: ResourceKind = ResourceKind::Voice;

    fn normalize(raw: Value) -> Result<Entities<Self>, FetchError> {
        let servers: RawVoiceSnapshot = parse_object(raw, "voice snapshot")?;
        let mut entities = BTreeMap::new();

        for channels in servers.into_values() {
            for (channel, members) in channels {
                for member in members {
                    let Ok(member) = serde_json::from_value::<RawMember>(member) else {
                        continue;
                    };
                    let Some(name) = text(member.name) else {
                        continue;
                    };

                    entities.insert(
                        VoiceKey::new(channel.clone(), name),
                        VoiceMember {
                            avatar: text(member.avatar),
                            streaming: truthy(member.streaming.as_ref()),
                            video: truthy(member.video.as_ref()),
                        },
                    );
                }
            }
        }

        Ok(entities)
    }

    fn rules() -> &'static [Rule<Self>] {
        &VOICE_RULES
    }
}
