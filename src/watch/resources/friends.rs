//! Friends list presence and activity
//!
//! Online/offline transitions are only announced for pinned friends. Game
//! activity is announced for everyone. Friends seen for the first time are
//! only recorded.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use super::{non_empty, parse, text};
use crate::notify::NotificationRequest;
use crate::watch::rules::{Change, ChangeKind, Entities, Resource, Rule};
use crate::watch::source::FetchError;
use crate::watch::ResourceKind;

/// Steam friends, keyed by steamid
pub struct Friends;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendState {
    pub name: String,
    pub avatar: Option<String>,
    /// "online", "away", "ingame", "offline", ...
    pub status: String,
    /// Current activity (game) id
    pub game_id: Option<String>,
    /// Current game name, when the backend reports one
    pub game: Option<String>,
}

impl FriendState {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }

    fn game_label(&self) -> &str {
        self.game
            .as_deref()
            .or(self.game_id.as_deref())
            .unwrap_or("a game")
    }
}

/// Friends opted into online/offline notifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinnedSet(HashSet<String>);

impl PinnedSet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    /// Parse the pinned-friends document: `{slot: steamid | null}`.
    ///
    /// Only non-empty string ids are kept. A plain array of ids is accepted
    /// as well.
    pub fn from_document(raw: &Value) -> Result<Self, FetchError> {
        let values: Vec<&Value> = match raw {
            Value::Object(slots) => slots.values().collect(),
            Value::Array(ids) => ids.iter().collect(),
            _ => {
                return Err(FetchError::Malformed(
                    "pinned friends is neither an object nor an array".into(),
                ))
            }
        };

        Ok(Self(
            values
                .into_iter()
                .filter_map(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }

    pub fn contains(&self, steamid: &str) -> bool {
        self.0.contains(steamid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawFriend {
    #[serde(default)]
    steamid: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    avatar: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    text: Option<Value>,
    #[serde(default)]
    gameid: Option<Value>,
}

/// Activity id from a number or string; 0 and "" mean no activity
fn activity_id(raw: Option<Value>) -> Option<String> {
    match raw? {
        Value::Number(n) if n.as_u64() == Some(0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => non_empty(Some(s)),
        _ => None,
    }
}

fn pinned(change: &Change<'_, Friends>, pins: &PinnedSet) -> bool {
    pins.contains(change.key())
}

fn came_online(change: &Change<'_, Friends>, pins: &PinnedSet) -> bool {
    pinned(change, pins)
        && change
            .both()
            .map_or(false, |(prev, curr)| !prev.is_online() && curr.is_online())
}

fn went_offline(change: &Change<'_, Friends>, pins: &PinnedSet) -> bool {
    pinned(change, pins)
        && change
            .both()
            .map_or(false, |(prev, curr)| prev.is_online() && !curr.is_online())
}

fn started_playing(change: &Change<'_, Friends>, _: &PinnedSet) -> bool {
    change
        .both()
        .map_or(false, |(prev, curr)| prev.game_id.is_none() && curr.game_id.is_some())
}

fn switched_game(change: &Change<'_, Friends>, _: &PinnedSet) -> bool {
    change.both().map_or(false, |(prev, curr)| match (&prev.game_id, &curr.game_id) {
        (Some(before), Some(after)) => before != after,
        _ => false,
    })
}

fn stopped_playing(change: &Change<'_, Friends>, _: &PinnedSet) -> bool {
    change
        .both()
        .map_or(false, |(prev, curr)| prev.game_id.is_some() && curr.game_id.is_none())
}

fn friend_notification(change: &Change<'_, Friends>, message: String) -> NotificationRequest {
    NotificationRequest::new("Steam", message)
        .avatar(change.latest().avatar.clone())
        .fallback_icon("steam.svg")
}

fn online_message(change: &Change<'_, Friends>) -> NotificationRequest {
    friend_notification(change, format!("{} is now online", change.latest().name))
}

fn offline_message(change: &Change<'_, Friends>) -> NotificationRequest {
    friend_notification(change, format!("{} went offline", change.latest().name))
}

fn playing_message(change: &Change<'_, Friends>) -> NotificationRequest {
    let friend = change.latest();
    friend_notification(change, format!("{} started playing {}", friend.name, friend.game_label()))
}

fn switched_message(change: &Change<'_, Friends>) -> NotificationRequest {
    let friend = change.latest();
    friend_notification(change, format!("{} switched to {}", friend.name, friend.game_label()))
}

fn stopped_message(change: &Change<'_, Friends>) -> NotificationRequest {
    friend_notification(change, format!("{} stopped playing", change.latest().name))
}

static FRIEND_RULES: [Rule<Friends>; 5] = [
    Rule {
        name: "came_online",
        on: ChangeKind::Persisted,
        fires: came_online,
        render: online_message,
    },
    Rule {
        name: "went_offline",
        on: ChangeKind::Persisted,
        fires: went_offline,
        render: offline_message,
    },
    Rule {
        name: "started_playing",
        on: ChangeKind::Persisted,
        fires: started_playing,
        render: playing_message,
    },
    Rule {
        name: "switched_game",
        on: ChangeKind::Persisted,
        fires: switched_game,
        render: switched_message,
    },
    Rule {
        name: "stopped_playing",
        on: ChangeKind::Persisted,
        fires: stopped_playing,
        render: stopped_message,
    },
];

impl Resource for Friends {
    type Key = String;
    type State = FriendState;
    type Context = PinnedSet;

    const KIND: ResourceKind = ResourceKind::Friends;

    fn normalize(raw: Value) -> Result<Entities<Self>, FetchError> {
        if !raw.is_array() {
            return Err(FetchError::Malformed("friends list is not an array".into()));
        }
        let friends: Vec<Value> = parse(raw, "friends list")?;
        let mut entities = BTreeMap::new();

        for friend in friends {
            let Ok(friend) = serde_json::from_value::<RawFriend>(friend) else {
                continue;
            };
            let Some(steamid) = text(friend.steamid) else {
                continue;
            };

            let game = text(friend.text)
                .as_deref()
                .and_then(|t| t.strip_prefix("In Game:"))
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty());

            entities.insert(
                steamid.clone(),
                FriendState {
                    name: text(friend.name).unwrap_or_else(|| steamid.clone()),
                    avatar: text(friend.avatar),
                    status: text(friend.status).unwrap_or_else(|| "offline".to_string()),
                    game_id: activity_id(friend.gameid),
                    game,
                },
            );
        }

        Ok(entities)
    }

    fn rules() -> &'static [Rule<Self>] {
        &FRIEND_RULES
    }
}
