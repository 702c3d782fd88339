//! Observable JSON object graphs.
//!
//! Wrap a JSON object or array with [`create`] (or one of the [`Observable`]
//! constructors) and every write or delete made through the node, or through
//! any node nested below it, is reported as a [`ChangeRecord`]:
//!
//! - immediately, one record at a time, to [`observe_immediate`] listeners;
//! - once per turn, as an ordered batch, to [`observe`] listeners.
//!
//! Records bubble up from nested nodes with a dotted `path` relative to the
//! observing node.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use object_observable::{create, observe, turn, Options};
//! use serde_json::json;
//!
//! let oo = create(json!({"a": {"b": 1}}), Options::default());
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! observe(&oo, move |batch| {
//!     sink.borrow_mut().extend(batch.iter().map(|r| r.path.clone()));
//! })
//! .unwrap();
//!
//! turn(|| {
//!     let a = oo.get("a").and_then(|a| a.into_node()).unwrap();
//!     a.set("b", 2i64);
//! });
//! assert_eq!(*seen.borrow(), vec![Some("a.b".to_string())]);
//! ```

mod adapter;
mod api;
mod date;
mod emitter;
mod error;
mod node;
mod options;
pub mod path;
mod record;
mod registry;
mod scheduler;
mod slot;

pub use adapter::{int_arg, opt_int_arg, MutableValue};
pub use api::{
    create, get_raw_object, is_observable, observe, observe_immediate, once, unobserve,
    unobserve_immediate,
};
pub use date::DateValue;
pub use emitter::ListenerId;
pub use error::{AdapterError, ObservableError};
pub use node::{Observable, Raw, MAX_ARRAY_LEN};
pub use options::Options;
pub use record::{ChangeKind, ChangeRecord};
pub use scheduler::{pending_microtasks, run_microtasks, turn, MicrotaskQueue, Scheduler, SchedulerRef, Task};
pub use slot::Slot;
