//! 3D printer lifecycle state

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::{parse_object, text};
use crate::notify::NotificationRequest;
use crate::watch::rules::{Change, ChangeKind, Entities, Resource, Rule};
use crate::watch::source::FetchError;
use crate::watch::ResourceKind;

/// Singleton printer
pub struct Printer;

/// Print lifecycle state as reported by the panel backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterState {
    Printing,
    Complete,
    Paused,
    Error,
    /// Any other label (Idle, Preparing, Offline, ...), kept verbatim
    Other(String),
    /// No state reported
    Unknown,
}

impl PrinterState {
    pub fn parse(label: Option<&str>) -> Self {
        match label {
            Some("Printing") => PrinterState::Printing,
            Some("Complete") => PrinterState::Complete,
            Some("Paused") => PrinterState::Paused,
            Some("Error") => PrinterState::Error,
            Some(other) => PrinterState::Other(other.to_string()),
            None => PrinterState::Unknown,
        }
    }

    /// Message for states worth announcing
    fn announcement(&self) -> Option<&'static str> {
        match self {
            PrinterState::Printing => Some("Print started"),
            PrinterState::Complete => Some("Print finished"),
            PrinterState::Paused => Some("Print paused"),
            PrinterState::Error => Some("Printer error"),
            PrinterState::Other(_) | PrinterState::Unknown => None,
        }
    }
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrinterState::Printing => f.write_str("Printing"),
            PrinterState::Complete => f.write_str("Complete"),
            PrinterState::Paused => f.write_str("Paused"),
            PrinterState::Error => f.write_str("Error"),
            PrinterState::Other(label) => f.write_str(label),
            PrinterState::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPrinterStatus {
    #[serde(default)]
    state: Option<Value>,
}

/// A sample without a state is no baseline: the next known state is not a transition
fn entered_notable_state(change: &Change<'_, Printer>, _: &()) -> bool {
    change.both().map_or(false, |(prev, curr)| {
        *prev != PrinterState::Unknown && prev != curr && curr.announcement().is_some()
    })
}

fn state_message(change: &Change<'_, Printer>) -> NotificationRequest {
    let message = change.latest().announcement().unwrap_or("Printer state changed");
    NotificationRequest::new("Bambu P1S", message).icon("printer.svg")
}

static PRINTER_RULES: [Rule<Printer>; 1] = [Rule {
    name: "state_changed",
    on: ChangeKind::Persisted,
    fires: entered_notable_state,
    render: state_message,
}];

impl Resource for Printer {
    type Key = ();
    type State = PrinterState;
    type Context = ();

    const KIND: ResourceKind = ResourceKind::Printer;

    fn normalize(raw: Value) -> Result<Entities<Self>, FetchError> {
        let status: RawPrinterStatus = parse_object(raw, "printer status")?;
        let state = PrinterState::parse(text(status.state).as_deref());

        Ok(BTreeMap::from([((), state)]))
    }

    fn rules() -> &'static [Rule<Self>] {
        &PRINTER_RULES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::rules::Differ;
    use crate::watch::snapshot::Snapshot;
    use serde_json::json;

    fn fired(prev: &str, curr: &str) -> Vec<String> {
        let prev = Printer::normalize(json!({"state": prev})).unwrap();
        let curr = Printer::normalize(json!({"state": curr})).unwrap();
        Differ::<Printer>::default()
            .compare(&prev, &curr)
            .into_iter()
            .map(|t| t.notification.message)
            .collect()
    }

    #[test]
    fn test_parse_states() {
        assert_eq!(PrinterState::parse(Some("Printing")), PrinterState::Printing);
        assert_eq!(PrinterState::parse(Some("Idle")), PrinterState::Other("Idle".into()));
        assert_eq!(PrinterState::parse(None), PrinterState::Unknown);

        let missing = Printer::normalize(json!({"progress": 0})).unwrap();
        assert_eq!(missing[&()], PrinterState::Unknown);
    }

    #[test]
    fn test_notable_transitions() {
        assert_eq!(fired("Idle", "Printing"), vec!["Print started"]);
        assert_eq!(fired("Printing", "Complete"), vec!["Print finished"]);
        assert_eq!(fired("Printing", "Paused"), vec!["Print paused"]);
        assert_eq!(fired("Printing", "Error"), vec!["Printer error"]);
    }

    #[test]
    fn test_quiet_transitions() {
        assert!(fired("Complete", "Idle").is_empty());
        assert!(fired("Idle", "Preparing").is_empty());
        assert!(fired("Printing", "Printing").is_empty());
    }

    #[test]
    fn test_mistyped_state_is_unknown() {
        let entities = Printer::normalize(json!({"state": 3, "progress": 40})).unwrap();
        assert_eq!(entities[&()], PrinterState::Unknown);
    }

    #[test]
    fn test_missing_state_mid_print_is_quiet() {
        let differ = Differ::<Printer>::default();
        let mut snapshot = Snapshot::<Printer>::new();

        let samples = [
            json!({"state": "Printing"}),
            json!({"progress": 40}),
            json!({"state": "Printing"}),
        ];
        let mut fired = Vec::new();
        for sample in samples {
            let entities = Printer::normalize(sample).unwrap();
            if let Some(transitions) = snapshot.advance(entities, &differ) {
                fired.extend(transitions.into_iter().map(|t| t.notification.message));
            }
        }
        assert!(fired.is_empty(), "unexpected notifications: {:?}", fired);

        // Real transitions after the gap still fire
        let entities = Printer::normalize(json!({"state": "Complete"})).unwrap();
        let transitions = snapshot.advance(entities, &differ).unwrap();
        assert_eq!(transitions[0].notification.message, "Print finished");
    }

    #[test]
    fn test_printer_icon() {
        let prev = Printer::normalize(json!({"state": "Paused"})).unwrap();
        let curr = Printer::normalize(json!({"state": "Printing"})).unwrap();
        let transitions = Differ::<Printer>::default().compare(&prev, &curr);
        assert_eq!(transitions[0].notification.title, "Bambu P1S");
        assert_eq!(transitions[0].notification.icon.icon.as_deref(), Some("printer.svg"));
    }
}
