//! Watched Resources
//!
//! Normalization and rule tables for each status endpoint:
//! - Lighting (Hexa Glide power)
//! - Voice presence (Discord voice channels)
//! - Printer (Bambu P1S print state)
//! - Friends (Steam friends presence and games)

mod friends;
mod lighting;
mod printer;
mod voice;

pub use friends::{FriendState, Friends, PinnedSet};
pub use lighting::{LightState, Lighting};
pub use printer::{Printer, PrinterState};
pub use voice::{VoiceKey, VoiceMember, VoicePresence};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::rules::{Change, Resource};
use super::source::FetchError;

/// Deserialize a status document that must be a JSON object
fn parse_object<T: DeserializeOwned>(raw: Value, what: &str) -> Result<T, FetchError> {
    if !raw.is_object() {
        return Err(FetchError::Malformed(format!("{} is not an object", what)));
    }
    parse(raw, what)
}

fn parse<T: DeserializeOwned>(raw: Value, what: &str) -> Result<T, FetchError> {
    serde_json::from_value(raw).map_err(|e| FetchError::Malformed(format!("{}: {}", what, e)))
}

/// Non-empty string or nothing
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Non-empty string field; any other JSON type counts as absent
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_empty(Some(s)),
        _ => None,
    }
}

/// Loose truthiness for flag fields: `false`, `0`, `""` and `null` are false
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Rule predicate that always fires
fn always<R: Resource>(_: &Change<'_, R>, _: &R::Context) -> bool {
    true
}
