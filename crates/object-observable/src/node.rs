//! Observable nodes: interception of reads, writes and deletes on one
//! wrapped composite, plus the wiring that makes nested mutations visible
//! from every ancestor.
//!
//! # Wiring
//!
//! Whenever a value is stored in a node (at creation or through [`set`]):
//!
//! 1. primitives and `null` are stored as they are;
//! 2. nodes are reused, never wrapped twice;
//! 3. raw JSON objects and arrays are wrapped with the parent's options;
//! 4. the parent subscribes to the child's immediate stream under the key it
//!    stores the child at, re-emitting every child record with that key
//!    prefixed to its path.
//!
//! With `recursive: false` steps 3 and 4 are skipped.
//!
//! Parents hold children; children never hold parents. The forwarding
//! subscription only keeps a weak handle on the parent, so one child may be
//! shared by any number of parents and outlives none of them by force.
//!
//! [`set`]: Observable::set

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::adapter::MutableValue;
use crate::emitter::{queued, Emitter, ListenerId};
use crate::error::AdapterError;
use crate::options::Options;
use crate::path::{self, parse_index};
use crate::record::ChangeRecord;
use crate::registry::{Forward, ForwardKey, Registry};
use crate::slot::Slot;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Largest array length a node accepts, as for host arrays. Writes past it
/// are rejected.
pub const MAX_ARRAY_LEN: usize = u32::MAX as usize;

fn next_node_id() -> u64 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Copies made so far while cloning a graph, keyed by source node id.
/// Keeps shared children shared and cycles finite.
type CopyMemo = HashMap<u64, Observable>;

/// The raw value owned by a node.
#[derive(Debug, Clone)]
pub enum Raw {
    Object(IndexMap<String, Slot>),
    Array(Vec<Slot>),
    Mutable(Box<dyn MutableValue>),
}

impl Raw {
    fn empty_like(&self) -> Raw {
        match self {
            Raw::Object(_) => Raw::Object(IndexMap::new()),
            Raw::Array(_) => Raw::Array(Vec::new()),
            Raw::Mutable(value) => Raw::Mutable(value.clone()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Slot> {
        match self {
            Raw::Object(map) => map.get(key).cloned(),
            Raw::Array(items) if key == "length" => Some(Slot::Json(Value::from(items.len()))),
            Raw::Array(items) => parse_index(key).and_then(|i| items.get(i)).cloned(),
            Raw::Mutable(_) => None,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        match self {
            Raw::Object(map) => map.contains_key(key),
            Raw::Array(items) => key == "length" || parse_index(key).is_some_and(|i| i < items.len()),
            Raw::Mutable(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Raw::Object(map) => map.len(),
            Raw::Array(items) => items.len(),
            Raw::Mutable(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        match self {
            Raw::Object(map) => map.keys().cloned().collect(),
            Raw::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            Raw::Mutable(_) => Vec::new(),
        }
    }

    /// Checks that `key` is writable and, on arrays, reserves room for it.
    ///
    /// Fails instead of aborting when the array would outgrow
    /// [`MAX_ARRAY_LEN`] or the allocation is refused.
    fn make_room(&mut self, key: &str) -> bool {
        match self {
            Raw::Object(_) => true,
            Raw::Array(items) => match parse_index(key) {
                Some(index) if index < MAX_ARRAY_LEN => {
                    index < items.len() || items.try_reserve(index + 1 - items.len()).is_ok()
                }
                _ => false,
            },
            Raw::Mutable(_) => false,
        }
    }

    /// Writes an already-validated key. Arrays pad holes with `null`.
    fn store(&mut self, key: &str, value: Slot) {
        match self {
            Raw::Object(map) => {
                map.insert(key.to_string(), value);
            }
            Raw::Array(items) => {
                let Some(index) = parse_index(key) else {
                    return;
                };
                if index < items.len() {
                    items[index] = value;
                } else {
                    items.resize(index, Slot::Json(Value::Null));
                    items.push(value);
                }
            }
            Raw::Mutable(_) => {}
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Raw::Object(_) => "object",
            Raw::Array(_) => "array",
            Raw::Mutable(value) => value.type_name(),
        }
    }
}

pub(crate) struct NodeInner {
    id: u64,
    raw: RefCell<Raw>,
    options: Options,
    pub(crate) immediate: Emitter<ChangeRecord>,
    batched: Emitter<[ChangeRecord]>,
    registry: RefCell<Registry>,
    pending: RefCell<Vec<ChangeRecord>>,
    armed: Cell<bool>,
}

/// Handle to a wrapped object, array or mutable value.
///
/// Cloning the handle is cheap and yields the same node.
#[derive(Clone)]
pub struct Observable {
    pub(crate) inner: Rc<NodeInner>,
}

impl Observable {
    /// An empty observable object with default options.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// An empty observable object.
    pub fn with_options(options: Options) -> Self {
        Self::alloc(Raw::Object(IndexMap::new()), options)
    }

    pub fn from_map(map: Map<String, Value>, options: Options) -> Self {
        Self::from_entries(map, options)
    }

    pub fn from_vec(items: Vec<Value>, options: Options) -> Self {
        Self::from_items(items, options)
    }

    /// Builds an object from entries that may already contain nodes.
    ///
    /// No change records are produced for the initial entries.
    pub fn from_entries<K, V, I>(entries: I, options: Options) -> Self
    where
        K: Into<String>,
        V: Into<Slot>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut memo = CopyMemo::new();
        let memo = options.clone.then_some(&mut memo);
        Self::build_object(
            entries.into_iter().map(|(k, v)| (Into::<String>::into(k), Into::<Slot>::into(v))),
            options,
            memo,
        )
    }

    /// Builds an array from items that may already contain nodes.
    pub fn from_items<V, I>(items: I, options: Options) -> Self
    where
        V: Into<Slot>,
        I: IntoIterator<Item = V>,
    {
        let mut memo = CopyMemo::new();
        let memo = options.clone.then_some(&mut memo);
        Self::build_array(items.into_iter().map(Into::<Slot>::into), options, memo)
    }

    /// Wraps a value whose state changes through method calls.
    pub fn adapt(value: impl MutableValue + 'static, options: Options) -> Self {
        Self::alloc(Raw::Mutable(Box::new(value)), options)
    }

    fn alloc(raw: Raw, options: Options) -> Self {
        let id = next_node_id();
        tracing::trace!(node = id, kind = raw.kind(), "wrapping value");
        Self {
            inner: Rc::new(NodeInner {
                id,
                raw: RefCell::new(raw),
                options,
                immediate: Emitter::new(),
                batched: Emitter::new(),
                registry: RefCell::new(Registry::default()),
                pending: RefCell::new(Vec::new()),
                armed: Cell::new(false),
            }),
        }
    }

    fn build_object(
        entries: impl Iterator<Item = (String, Slot)>,
        options: Options,
        mut memo: Option<&mut CopyMemo>,
    ) -> Self {
        let node = Self::alloc(Raw::Object(IndexMap::new()), options);
        for (key, value) in entries {
            let value = node.adopt(&key, value, memo.as_deref_mut());
            node.inner.raw.borrow_mut().store(&key, value);
        }
        node
    }

    fn build_array(
        items: impl Iterator<Item = Slot>,
        options: Options,
        mut memo: Option<&mut CopyMemo>,
    ) -> Self {
        let node = Self::alloc(Raw::Array(Vec::new()), options);
        for (index, value) in items.enumerate() {
            let key = index.to_string();
            let value = node.adopt(&key, value, memo.as_deref_mut());
            node.inner.raw.borrow_mut().store(&key, value);
        }
        node
    }

    /// Deep copy of this node's graph under `options`.
    pub(crate) fn copy_with(&self, options: &Options, memo: &mut CopyMemo) -> Observable {
        if let Some(done) = memo.get(&self.id()) {
            return done.clone();
        }
        let source = self.inner.raw.borrow().clone();
        let copy = Self::alloc(source.empty_like(), options.clone());
        memo.insert(self.id(), copy.clone());
        let entries: Vec<(String, Slot)> = match source {
            Raw::Object(map) => map.into_iter().collect(),
            Raw::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            Raw::Mutable(_) => Vec::new(),
        };
        for (key, value) in entries {
            let value = copy.adopt(&key, value, Some(&mut *memo));
            copy.inner.raw.borrow_mut().store(&key, value);
        }
        copy
    }

    /// Applies the wiring rules to a value about to be stored under `key`.
    fn adopt(&self, key: &str, value: Slot, memo: Option<&mut CopyMemo>) -> Slot {
        let options = &self.inner.options;
        let value = match (value, memo) {
            (Slot::Node(node), Some(memo)) => Slot::Node(node.copy_with(options, memo)),
            (Slot::Json(Value::Object(map)), memo) if options.recursive => Slot::Node(
                Self::build_object(map.into_iter().map(|(k, v)| (k, Slot::Json(v))), options.clone(), memo),
            ),
            (Slot::Json(Value::Array(items)), memo) if options.recursive => Slot::Node(
                Self::build_array(items.into_iter().map(Slot::Json), options.clone(), memo),
            ),
            (value, _) => value,
        };
        if options.recursive {
            if let Slot::Node(child) = &value {
                self.attach(key, child);
            }
        }
        value
    }

    /// Subscribes to `child` so its records are re-emitted here under `key`.
    fn attach(&self, key: &str, child: &Observable) {
        let parent = Rc::downgrade(&self.inner);
        let slot_key: ForwardKey = Rc::new(RefCell::new(key.to_string()));
        let forward_key = Rc::clone(&slot_key);
        let listener = child.inner.immediate.on(move |record: &ChangeRecord| {
            if let Some(inner) = parent.upgrade() {
                let key = forward_key.borrow().clone();
                Observable { inner }.changed(record, Some(&key));
            }
        });
        tracing::trace!(parent = self.id(), child = child.id(), key, "attached forwarding listener");
        let previous = self
            .inner
            .registry
            .borrow_mut()
            .insert(key.to_string(), Forward::new(child, listener, slot_key));
        if let Some(previous) = previous {
            previous.release();
        }
    }

    /// Drops the forwarding subscription stored under `key`, if any.
    fn detach(&self, key: &str) -> bool {
        let forward = self.inner.registry.borrow_mut().remove(key);
        match forward {
            Some(forward) => {
                tracing::trace!(parent = self.id(), key, "detached forwarding listener");
                forward.release();
                true
            }
            None => false,
        }
    }

    /// Moves the forwarding subscription for an array element that shifted.
    /// The subscription keeps its place among the child's listeners.
    fn rekey(&self, from: &str, to: &str) {
        let moved = self.inner.registry.borrow_mut().rekey(from, to);
        if let Ok(displaced) = moved {
            tracing::trace!(parent = self.id(), from, to, "re-keyed forwarding listener");
            if let Some(displaced) = displaced {
                displaced.release();
            }
        }
    }

    /// Records `record`, delivers it on the immediate stream and arms the
    /// batch flush on the first change of a turn.
    ///
    /// A record that already went through this node arrived over a cycle in
    /// the graph and is dropped.
    fn changed(&self, record: &ChangeRecord, origin: Option<&str>) {
        if record.passed_through(self.id()) {
            tracing::trace!(node = self.id(), key = %record.key, "dropping record that looped back");
            return;
        }
        let mut record = match origin {
            Some(key) => record.prefixed(key),
            None => record.clone(),
        };
        record.hops.push(self.id());
        self.inner.pending.borrow_mut().push(record.clone());
        self.inner.immediate.emit(&record);
        if !self.inner.armed.replace(true) {
            let node = Rc::downgrade(&self.inner);
            self.inner.options.scheduler.defer(Box::new(move || {
                if let Some(inner) = node.upgrade() {
                    Observable { inner }.flush();
                }
            }));
        }
    }

    fn flush(&self) {
        let batch = std::mem::take(&mut *self.inner.pending.borrow_mut());
        self.inner.armed.set(false);
        if batch.is_empty() {
            return;
        }
        tracing::debug!(node = self.id(), records = batch.len(), "flushing change batch");
        self.inner.batched.emit(&batch);
    }

    // ── Interception ─────────────────────────────────────────────────────

    /// Value at `key`. Arrays also answer `"length"`.
    pub fn get(&self, key: &str) -> Option<Slot> {
        self.inner.raw.borrow().get(key)
    }

    /// Arrays answer `"length"` and in-range indices. Adapted values have no
    /// keys.
    pub fn has(&self, key: &str) -> bool {
        self.inner.raw.borrow().has(key)
    }

    /// Writes `value` under `key` and emits a `set` record.
    ///
    /// On arrays `key` must be an index below [`MAX_ARRAY_LEN`] or
    /// `"length"`; writing past the end pads with `null`. Returns `false`
    /// without emitting when the key is not writable on this node.
    ///
    /// Storing a node somewhere inside its own subgraph creates a reference
    /// cycle. Such a graph is not freed until the cycle is broken with
    /// [`delete`](Self::delete) or another `set`.
    pub fn set(&self, key: &str, value: impl Into<Slot>) -> bool {
        let value = value.into();
        if key == "length" && self.is_array() {
            return self.set_length(&value);
        }
        if !self.inner.raw.borrow_mut().make_room(key) {
            return false;
        }
        let old = self.get(key);
        if old.is_some() {
            self.detach(key);
        }
        let value = self.adopt(key, value, None);
        self.inner.raw.borrow_mut().store(key, value.clone());
        self.changed(&ChangeRecord::set(self.clone(), key, value, old), Some(key));
        true
    }

    fn set_length(&self, value: &Slot) -> bool {
        let Some(new_len) = value
            .as_json()
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .filter(|n| *n <= MAX_ARRAY_LEN)
        else {
            return false;
        };
        let old_len = self.len();
        if new_len > old_len {
            let reserved = match &mut *self.inner.raw.borrow_mut() {
                Raw::Array(items) => items.try_reserve(new_len - old_len).is_ok(),
                _ => false,
            };
            if !reserved {
                return false;
            }
        }
        for index in new_len..old_len {
            self.detach(&index.to_string());
        }
        if let Raw::Array(items) = &mut *self.inner.raw.borrow_mut() {
            items.resize(new_len, Slot::Json(Value::Null));
        }
        let record = ChangeRecord::set(
            self.clone(),
            "length",
            Slot::Json(Value::from(new_len)),
            Some(Slot::Json(Value::from(old_len))),
        );
        self.changed(&record, Some("length"));
        true
    }

    /// Removes `key` and emits a `delete` record.
    ///
    /// On arrays the element is spliced out: later elements shift down and
    /// a `set` record for `"length"` precedes the `delete` record. Returns
    /// `false` when there was nothing to remove.
    pub fn delete(&self, key: &str) -> bool {
        let is_array = match &*self.inner.raw.borrow() {
            Raw::Object(map) if map.contains_key(key) => false,
            Raw::Array(items) if parse_index(key).is_some_and(|i| i < items.len()) => true,
            _ => return false,
        };
        if is_array {
            let Some(index) = parse_index(key) else {
                return false;
            };
            let old_len = self.len();
            let old = self.remove_index(index);
            let length = ChangeRecord::set(
                self.clone(),
                "length",
                Slot::Json(Value::from(old_len - 1)),
                Some(Slot::Json(Value::from(old_len))),
            );
            self.changed(&length, Some("length"));
            self.changed(&ChangeRecord::delete(self.clone(), key, old), Some(key));
        } else {
            self.detach(key);
            let old = match &mut *self.inner.raw.borrow_mut() {
                Raw::Object(map) => map.shift_remove(key),
                _ => None,
            };
            self.changed(&ChangeRecord::delete(self.clone(), key, old), Some(key));
        }
        true
    }

    /// Removes an array element without emitting, re-keying the forwarding
    /// subscriptions of every element after it.
    fn remove_index(&self, index: usize) -> Option<Slot> {
        let len = self.len();
        if index >= len {
            return None;
        }
        self.detach(&index.to_string());
        let old = match &mut *self.inner.raw.borrow_mut() {
            Raw::Array(items) => Some(items.remove(index)),
            _ => None,
        };
        for shifted in index + 1..len {
            self.rekey(&shifted.to_string(), &(shifted - 1).to_string());
        }
        old
    }

    /// Removes the last element of an array, emitting only its `delete`.
    fn delete_last(&self, index: usize) {
        let old = self.remove_index(index);
        let key = index.to_string();
        self.changed(&ChangeRecord::delete(self.clone(), key.as_str(), old), Some(&key));
    }

    // ── Array operations ─────────────────────────────────────────────────
    //
    // Each operation is expressed through the same `set`/`delete` steps a
    // host array would perform, so observers see the same record sequence.

    /// Appends `value` and returns the new length. Non-arrays are untouched.
    pub fn push(&self, value: impl Into<Slot>) -> usize {
        if !self.is_array() {
            return self.len();
        }
        let len = self.len();
        self.set(&len.to_string(), value);
        self.set("length", Value::from(len + 1));
        len + 1
    }

    /// Removes and returns the last element.
    pub fn pop(&self) -> Option<Slot> {
        if !self.is_array() {
            return None;
        }
        let len = self.len();
        if len == 0 {
            self.set("length", Value::from(0));
            return None;
        }
        let last = self.get(&(len - 1).to_string());
        self.delete_last(len - 1);
        self.set("length", Value::from(len - 1));
        last
    }

    /// Removes `delete_count` elements at `start`, inserts `items` in their
    /// place and returns the removed elements.
    pub fn splice<V, I>(&self, start: usize, delete_count: usize, items: I) -> Vec<Slot>
    where
        V: Into<Slot>,
        I: IntoIterator<Item = V>,
    {
        if !self.is_array() {
            return Vec::new();
        }
        let len = self.len();
        let start = start.min(len);
        let delete_count = delete_count.min(len - start);
        let items: Vec<Slot> = items.into_iter().map(Into::into).collect();
        let insert_count = items.len();

        let removed: Vec<Slot> = (start..start + delete_count)
            .filter_map(|i| self.get(&i.to_string()))
            .collect();

        if insert_count < delete_count {
            for k in start..len - delete_count {
                self.move_element(k + delete_count, k + insert_count);
            }
            for k in (len - delete_count + insert_count..len).rev() {
                self.delete_last(k);
            }
        } else if insert_count > delete_count {
            for k in (start + 1..=len - delete_count).rev() {
                self.move_element(k + delete_count - 1, k + insert_count - 1);
            }
        }
        for (offset, item) in items.into_iter().enumerate() {
            self.set(&(start + offset).to_string(), item);
        }
        self.set("length", Value::from(len - delete_count + insert_count));
        removed
    }

    fn move_element(&self, from: usize, to: usize) {
        match self.get(&from.to_string()) {
            Some(value) => {
                self.set(&to.to_string(), value);
            }
            None => {
                self.delete(&to.to_string());
            }
        }
    }

    pub fn insert(&self, index: usize, value: impl Into<Slot>) {
        self.splice(index, 0, [value]);
    }

    pub fn remove(&self, index: usize) -> Option<Slot> {
        self.splice(index, 1, Vec::<Slot>::new()).pop()
    }

    pub fn shift(&self) -> Option<Slot> {
        self.remove(0)
    }

    /// Prepends `value` and returns the new length.
    pub fn unshift(&self, value: impl Into<Slot>) -> usize {
        self.insert(0, value);
        self.len()
    }

    // ── Mutable values ───────────────────────────────────────────────────

    /// Calls `method` on a wrapped mutable value.
    ///
    /// Mutating methods emit a `set` record whose `key` is the field the
    /// method changes and whose `old`/`value` are detached snapshots of the
    /// whole value before and after the call.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, AdapterError> {
        let before = match &*self.inner.raw.borrow() {
            Raw::Mutable(value) => value.field_for(method).map(|field| (field, value.clone())),
            _ => return Err(AdapterError::NotAdapted),
        };
        let result = match &mut *self.inner.raw.borrow_mut() {
            Raw::Mutable(value) => value.call(method, args)?,
            _ => return Err(AdapterError::NotAdapted),
        };
        if let Some((field, before)) = before {
            let after = match &*self.inner.raw.borrow() {
                Raw::Mutable(value) => value.clone(),
                _ => return Ok(result),
            };
            let options = &self.inner.options;
            let old = Self::alloc(Raw::Mutable(before), options.clone());
            let new = Self::alloc(Raw::Mutable(after), options.clone());
            let record = ChangeRecord::set(self.clone(), field, Slot::Node(new), Some(Slot::Node(old)));
            self.changed(&record, None);
        }
        Ok(result)
    }

    // ── Subscriptions ────────────────────────────────────────────────────

    /// Subscribes to every record as it happens.
    ///
    /// A record caused by the listener itself is delivered to it after its
    /// current call returns.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeRecord) + 'static,
    {
        self.inner.immediate.on(queued::<ChangeRecord, _>(listener))
    }

    pub fn off_change(&self, listener_id: ListenerId) -> bool {
        self.inner.immediate.off(listener_id)
    }

    /// Subscribes to the per-turn batches.
    pub fn on_changes<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&[ChangeRecord]) + 'static,
    {
        self.inner.batched.on(queued::<[ChangeRecord], _>(listener))
    }

    /// Like [`on_changes`](Self::on_changes) but unsubscribes after the
    /// first batch.
    pub fn once_changes<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&[ChangeRecord]) + 'static,
    {
        self.inner.batched.once(queued::<[ChangeRecord], _>(listener))
    }

    pub fn off_changes(&self, listener_id: ListenerId) -> bool {
        self.inner.batched.off(listener_id)
    }

    /// Number of records waiting for the next flush.
    pub fn pending_changes(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    // ── Introspection ────────────────────────────────────────────────────

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn ptr_eq(&self, other: &Observable) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Copy of the raw value. Nested nodes stay wrapped.
    pub fn raw(&self) -> Raw {
        self.inner.raw.borrow().clone()
    }

    pub fn is_array(&self) -> bool {
        matches!(&*self.inner.raw.borrow(), Raw::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(&*self.inner.raw.borrow(), Raw::Object(_))
    }

    pub fn is_mutable(&self) -> bool {
        matches!(&*self.inner.raw.borrow(), Raw::Mutable(_))
    }

    pub fn len(&self) -> usize {
        self.inner.raw.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Own keys in insertion order; indices for arrays.
    pub fn keys(&self) -> Vec<String> {
        self.inner.raw.borrow().keys()
    }

    /// Whether a forwarding subscription is held for the child at `key`.
    pub fn is_forwarding(&self, key: &str) -> bool {
        self.inner.registry.borrow().contains(key)
    }

    /// Number of forwarding subscriptions this node holds on its children.
    pub fn forwarding_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Number of subscriptions on this node's immediate stream, forwarding
    /// parents included.
    pub fn immediate_listener_count(&self) -> usize {
        self.inner.immediate.len()
    }

    /// Resolves a dotted path as found in [`ChangeRecord::path`].
    pub fn get_path(&self, dotted: &str) -> Option<Slot> {
        let mut current = Slot::Node(self.clone());
        for segment in path::segments(dotted) {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Mutates a raw (unwrapped) value in place, bypassing interception.
    ///
    /// Only reaches values left raw by `recursive: false`; returns `None`
    /// for missing keys and for wrapped children.
    pub fn modify_raw<R>(&self, key: &str, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let mut taken = {
            let mut raw = self.inner.raw.borrow_mut();
            let slot = match &mut *raw {
                Raw::Object(map) => map.get_mut(key),
                Raw::Array(items) => parse_index(key).and_then(|i| items.get_mut(i)),
                Raw::Mutable(_) => None,
            }?;
            match slot {
                Slot::Json(value) => std::mem::take(value),
                Slot::Node(_) => return None,
            }
        };
        let out = f(&mut taken);
        self.inner.raw.borrow_mut().store(key, Slot::Json(taken));
        Some(out)
    }

    /// Plain JSON view. Cyclic references render as `null`.
    pub fn to_json(&self) -> Value {
        self.to_json_guarded(&mut Vec::new())
    }

    fn to_json_guarded(&self, stack: &mut Vec<u64>) -> Value {
        if stack.contains(&self.id()) {
            return Value::Null;
        }
        stack.push(self.id());
        let slot_json = |slot: &Slot, stack: &mut Vec<u64>| match slot {
            Slot::Json(value) => value.clone(),
            Slot::Node(node) => node.to_json_guarded(stack),
        };
        let out = match &*self.inner.raw.borrow() {
            Raw::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), slot_json(v, stack)))
                    .collect(),
            ),
            Raw::Array(items) => Value::Array(items.iter().map(|v| slot_json(v, stack)).collect()),
            Raw::Mutable(value) => value.snapshot(),
        };
        stack.pop();
        out
    }
}

impl Default for Observable {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Observable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.inner.raw.borrow();
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("kind", &raw.kind())
            .field("len", &raw.len())
            .finish_non_exhaustive()
    }
}

impl Serialize for Observable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
