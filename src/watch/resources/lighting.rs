//! Lighting power state

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::parse_object;
use crate::notify::NotificationRequest;
use crate::watch::rules::{Change, ChangeKind, Entities, Resource, Rule};
use crate::watch::source::FetchError;
use crate::watch::ResourceKind;

/// Singleton light controller
pub struct Lighting;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightState {
    pub power: bool,
}

#[derive(Debug, Deserialize)]
struct RawLightStatus {
    #[serde(default)]
    power: Option<Value>,
}

fn power_toggled(change: &Change<'_, Lighting>, _: &()) -> bool {
    change.both().map_or(false, |(prev, curr)| prev.power != curr.power)
}

fn power_message(change: &Change<'_, Lighting>) -> NotificationRequest {
    let message = if change.latest().power {
        "Lights were turned on"
    } else {
        "Lights were turned off"
    };
    NotificationRequest::new("Hexa Glide", message).icon("light.svg")
}

static LIGHTING_RULES: [Rule<Lighting>; 1] = [Rule {
    name: "power_toggled",
    on: ChangeKind::Persisted,
    fires: power_toggled,
    render: power_message,
}];

impl Resource for Lighting {
    type Key = ();
    type State = LightState;
    type Context = ();

    const KIND: ResourceKind = ResourceKind::Lighting;

    fn normalize(raw: Value) -> Result<Entities<Self>, FetchError> {
        let status: RawLightStatus = parse_object(raw, "lighting status")?;

        // The panel reports "on"/"off"; the LAN path reports a boolean
        let power = match status.power {
            Some(Value::String(s)) => s.eq_ignore_ascii_case("on"),
            Some(Value::Bool(b)) => b,
            _ => false,
        };

        Ok(BTreeMap::from([((), LightState { power })]))
    }

    fn rules() -> &'static [Rule<Self>] {
        &LIGHTING_RULES
    }
}
