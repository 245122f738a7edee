//! Diff engine
//!
//! Compares two entity maps of one resource and evaluates the resource's rule
//! table against every entity. Entities are visited in key order and rules in
//! table order, so the emitted notifications are deterministic.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::source::FetchError;
use super::ResourceKind;
use crate::notify::NotificationRequest;

/// Normalized state of every entity of one resource, keyed by identity
pub type Entities<R> = BTreeMap<<R as Resource>::Key, <R as Resource>::State>;

/// A polled resource type: how to normalize it and which transitions matter
pub trait Resource: Send + Sync + 'static {
    /// Stable identity of one entity
    type Key: Ord + Clone + fmt::Debug + Send + Sync;
    /// Normalized state record of one entity
    type State: Clone + PartialEq + fmt::Debug + Send + Sync;
    /// Extra input the rules need (e.g. the pinned set)
    type Context: Send + Sync;

    const KIND: ResourceKind;

    /// Turn a raw status document into an entity map.
    ///
    /// Missing fields default to neutral values; only a document of the
    /// wrong overall shape is an error.
    fn normalize(raw: Value) -> Result<Entities<Self>, FetchError>;

    /// Transition rules, evaluated in order
    fn rules() -> &'static [Rule<Self>]
    where
        Self: Sized;
}

/// Which side(s) of the comparison an entity is present on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Present now, absent before
    Appeared,
    /// Present before, absent now
    Vanished,
    /// Present on both sides
    Persisted,
}

/// One entity's (previous, current) pair
pub enum Change<'a, R: Resource> {
    Appeared {
        key: &'a R::Key,
        curr: &'a R::State,
    },
    Vanished {
        key: &'a R::Key,
        prev: &'a R::State,
    },
    Persisted {
        key: &'a R::Key,
        prev: &'a R::State,
        curr: &'a R::State,
    },
}

impl<'a, R: Resource> Change<'a, R> {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Appeared { .. } => ChangeKind::Appeared,
            Change::Vanished { .. } => ChangeKind::Vanished,
            Change::Persisted { .. } => ChangeKind::Persisted,
        }
    }

    pub fn key(&self) -> &'a R::Key {
        match self {
            Change::Appeared { key, .. }
            | Change::Vanished { key, .. }
            | Change::Persisted { key, .. } => key,
        }
    }

    /// Most recent known state: current if present, otherwise previous
    pub fn latest(&self) -> &'a R::State {
        match self {
            Change::Appeared { curr, .. } | Change::Persisted { curr, .. } => curr,
            Change::Vanished { prev, .. } => prev,
        }
    }

    /// Both states, only for entities seen on both sides
    pub fn both(&self) -> Option<(&'a R::State, &'a R::State)> {
        match self {
            Change::Persisted { prev, curr, .. } => Some((prev, curr)),
            _ => None,
        }
    }
}

/// A transition rule: when it applies, whether it fires, what it says
pub struct Rule<R: Resource> {
    pub name: &'static str,
    pub on: ChangeKind,
    pub fires: fn(&Change<'_, R>, &R::Context) -> bool,
    pub render: fn(&Change<'_, R>) -> NotificationRequest,
}

/// A rule that fired for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub rule: &'static str,
    pub notification: NotificationRequest,
}

/// Evaluate `rules` for every entity in `prev` ∪ `curr`
pub fn diff<R: Resource>(
    prev: &Entities<R>,
    curr: &Entities<R>,
    rules: &[Rule<R>],
    context: &R::Context,
) -> Vec<Transition> {
    let keys: BTreeSet<&R::Key> = prev.keys().chain(curr.keys()).collect();
    let mut transitions = Vec::new();

    for key in keys {
        let change = match (prev.get(key), curr.get(key)) {
            (None, Some(curr)) => Change::Appeared { key, curr },
            (Some(prev), None) => Change::Vanished { key, prev },
            (Some(prev), Some(curr)) => Change::Persisted { key, prev, curr },
            (None, None) => continue,
        };

        let kind = change.kind();
        for rule in rules.iter().filter(|r| r.on == kind) {
            if (rule.fires)(&change, context) {
                transitions.push(Transition {
                    rule: rule.name,
                    notification: (rule.render)(&change),
                });
            }
        }
    }

    transitions
}

/// Resource differ bound to its rule context
pub struct Differ<R: Resource> {
    context: R::Context,
}

impl<R: Resource> Differ<R> {
    pub fn new(context: R::Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &R::Context {
        &self.context
    }

    pub fn compare(&self, prev: &Entities<R>, curr: &Entities<R>) -> Vec<Transition> {
        diff(prev, curr, R::rules(), &self.context)
    }
}

impl<R: Resource<Context = ()>> Default for Differ<R> {
    fn default() -> Self {
        Self::new(())
    }
}
