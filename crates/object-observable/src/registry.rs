//! Forwarding subscriptions a node holds on its children.
//!
//! For every key whose value is a wrapped child, the parent keeps exactly one
//! subscription on that child's immediate stream. The entry is keyed by the
//! parent-side key and must be released before the key is overwritten or
//! deleted, otherwise the old child would keep forwarding under that key.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::emitter::ListenerId;
use crate::node::{NodeInner, Observable};

/// Key under which a forwarding listener re-emits. Shared with the listener
/// so an array element that shifts keeps its subscription.
pub(crate) type ForwardKey = Rc<RefCell<String>>;

pub(crate) struct Forward {
    child: Weak<NodeInner>,
    listener: ListenerId,
    key: ForwardKey,
}

impl Forward {
    pub(crate) fn new(child: &Observable, listener: ListenerId, key: ForwardKey) -> Self {
        Self {
            child: Rc::downgrade(&child.inner),
            listener,
            key,
        }
    }

    pub(crate) fn child(&self) -> Option<Observable> {
        self.child.upgrade().map(|inner| Observable { inner })
    }

    /// Points the listener at `key` without resubscribing.
    pub(crate) fn rename(&self, key: &str) {
        *self.key.borrow_mut() = key.to_string();
    }

    /// Unsubscribes from the child, if it is still alive.
    pub(crate) fn release(self) {
        if let Some(child) = self.child() {
            child.inner.immediate.off(self.listener);
        }
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<String, Forward>,
}

impl Registry {
    /// Returns the entry previously stored under `key`, which the caller
    /// must release.
    pub(crate) fn insert(&mut self, key: String, forward: Forward) -> Option<Forward> {
        self.entries.insert(key, forward)
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Forward> {
        self.entries.remove(key)
    }

    /// Moves the entry at `from` to `to`. Returns `Err(())` when there was
    /// nothing at `from`, otherwise the entry displaced at `to`, which the
    /// caller must release.
    pub(crate) fn rekey(&mut self, from: &str, to: &str) -> Result<Option<Forward>, ()> {
        let forward = self.entries.remove(from).ok_or(())?;
        forward.rename(to);
        Ok(self.entries.insert(to.to_string(), forward))
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribe(child: &Observable, key: &str) -> (Forward, ForwardKey) {
        let key: ForwardKey = Rc::new(RefCell::new(key.to_string()));
        let listener = child.inner.immediate.on(|_| {});
        (Forward::new(child, listener, Rc::clone(&key)), key)
    }

    #[test]
    fn insert_reports_replaced_entry() {
        let child = Observable::new();
        let mut registry = Registry::default();
        let (first, _) = subscribe(&child, "a");
        let (second, _) = subscribe(&child, "a");
        assert!(registry.insert("a".into(), first).is_none());
        let replaced = registry.insert("a".into(), second).unwrap();
        assert_eq!(child.immediate_listener_count(), 2);
        replaced.release();
        assert_eq!(child.immediate_listener_count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_then_release_unsubscribes() {
        let child = Observable::new();
        let mut registry = Registry::default();
        let (forward, _) = subscribe(&child, "a");
        registry.insert("a".into(), forward);
        assert!(registry.contains("a"));
        registry.remove("a").unwrap().release();
        assert!(!registry.contains("a"));
        assert!(registry.remove("a").is_none());
        assert_eq!(child.immediate_listener_count(), 0);
    }

    #[test]
    fn rekey_renames_without_resubscribing() {
        let child = Observable::new();
        let mut registry = Registry::default();
        let (forward, key) = subscribe(&child, "2");
        registry.insert("2".into(), forward);
        assert!(registry.rekey("2", "1").unwrap().is_none());
        assert_eq!(*key.borrow(), "1");
        assert!(registry.contains("1"));
        assert!(!registry.contains("2"));
        assert_eq!(child.immediate_listener_count(), 1);
        assert!(registry.rekey("2", "0").is_err());
    }

    #[test]
    fn release_after_child_dropped_is_a_no_op() {
        let child = Observable::new();
        let (forward, _) = subscribe(&child, "a");
        drop(child);
        assert!(forward.child().is_none());
        forward.release();
    }
}
