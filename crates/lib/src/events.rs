//! Mutation events.
//!
//! The collection engine reports every step of the mutation lifecycle through
//! a [`Notifier`]. How events are consumed is up to the notifier: the crate
//! ships a no-op, a `tracing` logger and an in-memory [`EventLog`], and any
//! `Fn(&Target, Phase, &Payload)` closure is a notifier too.
//!
//! `before-add` observers receive the child before it is stored and may
//! adjust its fields with [`Child::set_field`]; the collection recomputes the
//! child's name afterwards.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::locks;
use crate::path::ResourcePath;
use crate::record::{ChangeSet, Child};
use crate::value::Fields;

/// Lifecycle step an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    BeforeAdd,
    AfterAdd,
    BeforeEdit,
    AfterEdit,
    Moved,
    BeforeDelete,
    AfterDelete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeforeAdd => "before-add",
            Phase::AfterAdd => "after-add",
            Phase::BeforeEdit => "before-edit",
            Phase::AfterEdit => "after-edit",
            Phase::Moved => "moved",
            Phase::BeforeDelete => "before-delete",
            Phase::AfterDelete => "after-delete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node an event is about.
#[derive(Debug, Clone)]
pub enum Target {
    /// A child record.
    Child(Child),
    /// A collection node, by path.
    Collection(ResourcePath),
}

impl Target {
    /// Path of the target, if it has one yet.
    pub fn path(&self) -> Option<ResourcePath> {
        match self {
            Target::Child(child) => child.path(),
            Target::Collection(path) => Some(path.clone()),
        }
    }

    pub fn as_child(&self) -> Option<&Child> {
        match self {
            Target::Child(child) => Some(child),
            Target::Collection(_) => None,
        }
    }
}

/// Data attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// No data.
    Empty,
    /// Fields of a pending add or edit.
    Fields { fields: Fields },
    /// The child's name changed; `old_path` no longer addresses it.
    Moved { old_path: ResourcePath },
    /// A finished edit: every requested field and the ones that changed.
    Edited { fields: Fields, changes: ChangeSet },
    /// A child was removed from `path`.
    Removed { path: Option<ResourcePath> },
}

/// Receiver of mutation events. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, target: &Target, phase: Phase, payload: &Payload);
}

impl<F> Notifier for F
where
    F: Fn(&Target, Phase, &Payload) + Send + Sync,
{
    fn notify(&self, target: &Target, phase: Phase, payload: &Payload) {
        self(target, phase, payload)
    }
}

/// Notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _target: &Target, _phase: Phase, _payload: &Payload) {}
}

/// Notifier that logs every event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, target: &Target, phase: Phase, payload: &Payload) {
        let path = target
            .path()
            .map_or_else(|| crate::constants::UNBOUND.to_string(), |p| p.to_string());
        tracing::debug!(%phase, path = %path, ?payload, "Collection event");
    }
}

/// A recorded event.
#[derive(Debug, Clone)]
pub struct Event {
    pub target: Target,
    pub phase: Phase,
    pub payload: Payload,
}

/// Notifier that records events in memory.
///
/// Clones share one log, so a clone can be handed to a context while the
/// original is inspected.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        locks::read(&self.events).clone()
    }

    /// Recorded phases in order.
    pub fn phases(&self) -> Vec<Phase> {
        locks::read(&self.events).iter().map(|e| e.phase).collect()
    }

    /// Recorded events of one phase.
    pub fn of_phase(&self, phase: Phase) -> Vec<Event> {
        locks::read(&self.events)
            .iter()
            .filter(|e| e.phase == phase)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        locks::write(&self.events).clear();
    }
}

impl Notifier for EventLog {
    fn notify(&self, target: &Target, phase: Phase, payload: &Payload) {
        locks::write(&self.events).push(Event {
            target: target.clone(),
            phase,
            payload: payload.clone(),
        });
    }
}
