//! Bound records.
//!
//! A row becomes a tree node once it is paired with its parent path and
//! name. [`Child`] is that pairing: a shared handle whose clones all point at
//! the same instance, so the identity cache can hand out one object per path
//! and callers can compare identities with [`Child::ptr_eq`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::locks;
use crate::path::ResourcePath;
use crate::value::{Fields, Value};

/// A record bound into the resource tree.
#[derive(Clone)]
pub struct Child {
    inner: Arc<ChildInner>,
}

struct ChildInner {
    parent: RwLock<Option<ResourcePath>>,
    name: RwLock<Option<String>>,
    fields: RwLock<Fields>,
}

impl Child {
    /// An unbound child holding `fields`.
    pub fn new(fields: Fields) -> Self {
        Self {
            inner: Arc::new(ChildInner {
                parent: RwLock::new(None),
                name: RwLock::new(None),
                fields: RwLock::new(fields),
            }),
        }
    }

    /// Whether `a` and `b` are the same instance.
    pub fn ptr_eq(a: &Child, b: &Child) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Path of the node this child hangs under.
    pub fn parent(&self) -> Option<ResourcePath> {
        locks::read(&self.inner.parent).clone()
    }

    pub fn name(&self) -> Option<String> {
        locks::read(&self.inner.name).clone()
    }

    /// Full path, available once both parent and name are bound.
    pub fn path(&self) -> Option<ResourcePath> {
        let parent = self.parent()?;
        let name = self.name()?;
        Some(parent.child(name))
    }

    /// Current value of `field`.
    pub fn get(&self, field: &str) -> Option<Value> {
        locks::read(&self.inner.fields).get(field).cloned()
    }

    /// Snapshot of every field.
    pub fn fields(&self) -> Fields {
        locks::read(&self.inner.fields).clone()
    }

    /// Overwrite a single field in memory.
    ///
    /// Meant for `before-add` observers adjusting a record that is about to be
    /// stored. Changes to stored records go through
    /// [`Collection::edit`](crate::collection::Collection::edit), which
    /// persists them and keeps the cache consistent.
    pub fn set_field(&self, field: impl Into<String>, value: impl Into<Value>) {
        locks::write(&self.inner.fields).insert(field.into(), value.into());
    }

    pub(crate) fn bind_parent(&self, parent: Option<ResourcePath>) {
        *locks::write(&self.inner.parent) = parent;
    }

    pub(crate) fn bind_name(&self, name: Option<String>) {
        *locks::write(&self.inner.name) = name;
    }

    pub(crate) fn apply(&self, updates: &Fields) {
        let mut fields = locks::write(&self.inner.fields);
        for (k, v) in updates {
            fields.insert(k.clone(), v.clone());
        }
    }

    pub(crate) fn replace_fields(&self, fields: Fields) {
        *locks::write(&self.inner.fields) = fields;
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Child")
            .field("parent", &self.parent())
            .field("name", &self.name())
            .field("fields", &self.fields())
            .finish()
    }
}

/// Old and new value of a field that an edit actually changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub old: Value,
    pub new: Value,
}

/// Field name to [`Change`] for every field an edit modified.
pub type ChangeSet = BTreeMap<String, Change>;

/// Changes that applying `pending` on top of `current` would make.
///
/// Fields whose pending value equals the current one are left out.
pub fn diff(current: &Fields, pending: &Fields) -> ChangeSet {
    pending
        .iter()
        .filter_map(|(field, new)| {
            let old = current.get(field).cloned().unwrap_or_default();
            (old != *new).then(|| {
                (
                    field.clone(),
                    Change {
                        old,
                        new: new.clone(),
                    },
                )
            })
        })
        .collect()
}
