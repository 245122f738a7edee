//! Snapshot Store
//!
//! Last observed entity map of one resource. Owned by that resource's poller,
//! which is its only writer.

use super::rules::{Differ, Entities, Resource, Transition};

/// Diff baseline for one resource
pub enum Snapshot<R: Resource> {
    /// No successful poll yet, nothing to compare against
    Uninitialized,
    /// Last good state; an empty map means "known empty", not "unknown"
    Initialized(Entities<R>),
}

impl<R: Resource> Snapshot<R> {
    pub fn new() -> Self {
        Snapshot::Uninitialized
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self, Snapshot::Initialized(_))
    }

    pub fn entities(&self) -> Option<&Entities<R>> {
        match self {
            Snapshot::Uninitialized => None,
            Snapshot::Initialized(entities) => Some(entities),
        }
    }

    /// Replace the baseline with `current`.
    ///
    /// The first call only initializes and returns `None`. Later calls return
    /// the transitions from the previous baseline to `current`.
    pub fn advance(&mut self, current: Entities<R>, differ: &Differ<R>) -> Option<Vec<Transition>> {
        let transitions = match self {
            Snapshot::Uninitialized => None,
            Snapshot::Initialized(previous) => Some(differ.compare(previous, &current)),
        };

        *self = Snapshot::Initialized(current);
        transitions
    }
}

impl<R: Resource> Default for Snapshot<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::{LightState, Lighting};
    use std::collections::BTreeMap;

    fn lights(power: bool) -> Entities<Lighting> {
        BTreeMap::from([((), LightState { power })])
    }

    #[test]
    fn test_first_advance_initializes_silently() {
        let differ = Differ::<Lighting>::default();
        let mut snapshot = Snapshot::<Lighting>::new();
        assert!(!snapshot.is_initialized());

        assert!(snapshot.advance(lights(true), &differ).is_none());
        assert!(snapshot.is_initialized());
        assert_eq!(snapshot.entities(), Some(&lights(true)));
    }

    #[test]
    fn test_empty_state_is_initialized() {
        let differ = Differ::<Lighting>::default();
        let mut snapshot = Snapshot::<Lighting>::new();

        assert!(snapshot.advance(BTreeMap::new(), &differ).is_none());
        assert!(snapshot.is_initialized());

        // Compared against the known-empty baseline from now on
        let transitions = snapshot.advance(lights(true), &differ);
        assert_eq!(transitions, Some(vec![]));
    }

    #[test]
    fn test_advance_replaces_baseline() {
        let differ = Differ::<Lighting>::default();
        let mut snapshot = Snapshot::<Lighting>::new();

        snapshot.advance(lights(false), &differ);
        let transitions = snapshot.advance(lights(true), &differ).unwrap();
        assert_eq!(transitions.len(), 1);

        let transitions = snapshot.advance(lights(true), &differ).unwrap();
        assert!(transitions.is_empty());
    }
}
