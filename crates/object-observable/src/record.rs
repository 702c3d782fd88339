use serde::Serialize;

use crate::node::Observable;
use crate::path;
use crate::slot::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Set,
    Delete,
}

/// One mutation, as seen by a particular observer.
///
/// `path` is relative to the node the record was delivered by: a root that
/// observes `a.b = 2` sees `path = "a.b"` while the node at `a` sees `"b"`.
///
/// `value` and `old` hold what was stored, not a copy of it. A nested node
/// in either field is the live node, so reading it later shows its state at
/// that time rather than at the time of the mutation.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Node whose raw value was mutated.
    #[serde(skip)]
    pub target: Observable,
    pub key: String,
    /// New value; `None` for deletes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Slot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Ids of the nodes that have emitted this record so far.
    #[serde(skip)]
    pub(crate) hops: Vec<u64>,
}

impl ChangeRecord {
    pub fn set(target: Observable, key: impl Into<String>, value: Slot, old: Option<Slot>) -> Self {
        Self {
            kind: ChangeKind::Set,
            target,
            key: key.into(),
            value: Some(value),
            old,
            path: None,
            hops: Vec::new(),
        }
    }

    pub fn delete(target: Observable, key: impl Into<String>, old: Option<Slot>) -> Self {
        Self {
            kind: ChangeKind::Delete,
            target,
            key: key.into(),
            value: None,
            old,
            path: None,
            hops: Vec::new(),
        }
    }

    /// Copy of this record as re-emitted from under `key`.
    pub fn prefixed(&self, key: &str) -> Self {
        let mut out = self.clone();
        out.path = Some(path::compose(key, self.path.as_deref()));
        out
    }

    /// Whether the node with `id` has already emitted this record.
    pub(crate) fn passed_through(&self, id: u64) -> bool {
        self.hops.contains(&id)
    }

    pub fn is_set(&self) -> bool {
        self.kind == ChangeKind::Set
    }

    pub fn is_delete(&self) -> bool {
        self.kind == ChangeKind::Delete
    }
}
