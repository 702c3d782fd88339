//! Free-function entry points over [`Slot`].
//!
//! These accept any slot, wrapped or not, and report
//! [`ObservableError::NotObservable`] for values that are not nodes. Code
//! that already holds an [`Observable`] can call its inherent methods.

use std::collections::HashMap;

use serde_json::Value;

use crate::emitter::ListenerId;
use crate::error::ObservableError;
use crate::node::{Observable, Raw};
use crate::options::Options;
use crate::record::ChangeRecord;
use crate::slot::Slot;

/// Wraps `value` in an observable node.
///
/// Objects and arrays become nodes; primitives and `null` come back as they
/// are. Passing a node returns that same node unless `options.clone` asks
/// for a fresh copy.
pub fn create(value: impl Into<Slot>, options: Options) -> Slot {
    match value.into() {
        Slot::Json(Value::Object(map)) => Slot::Node(Observable::from_map(map, options)),
        Slot::Json(Value::Array(items)) => Slot::Node(Observable::from_vec(items, options)),
        Slot::Node(node) if options.clone => {
            Slot::Node(node.copy_with(&options, &mut HashMap::new()))
        }
        other => other,
    }
}

pub fn is_observable(value: &Slot) -> bool {
    value.is_observable()
}

fn node(value: &Slot) -> Result<&Observable, ObservableError> {
    value.as_node().ok_or(ObservableError::NotObservable)
}

/// Subscribes `listener` to the per-turn batches of `value`.
pub fn observe<F>(value: &Slot, listener: F) -> Result<ListenerId, ObservableError>
where
    F: FnMut(&[ChangeRecord]) + 'static,
{
    Ok(node(value)?.on_changes(listener))
}

/// Like [`observe`], but only for the next batch.
pub fn once<F>(value: &Slot, listener: F) -> Result<ListenerId, ObservableError>
where
    F: FnMut(&[ChangeRecord]) + 'static,
{
    Ok(node(value)?.once_changes(listener))
}

/// Removes a batched subscription. `Ok(false)` means it was not registered.
pub fn unobserve(value: &Slot, listener_id: ListenerId) -> Result<bool, ObservableError> {
    Ok(node(value)?.off_changes(listener_id))
}

/// Subscribes `listener` to every record of `value` as it happens.
pub fn observe_immediate<F>(value: &Slot, listener: F) -> Result<ListenerId, ObservableError>
where
    F: FnMut(&ChangeRecord) + 'static,
{
    Ok(node(value)?.on_change(listener))
}

pub fn unobserve_immediate(value: &Slot, listener_id: ListenerId) -> Result<bool, ObservableError> {
    Ok(node(value)?.off_change(listener_id))
}

/// The value a node wraps. Only the top level is unwrapped: nested nodes
/// stay nodes.
pub fn get_raw_object(value: &Slot) -> Result<Raw, ObservableError> {
    Ok(node(value)?.raw())
}
