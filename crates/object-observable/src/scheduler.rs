//! Deferred execution used to coalesce change records into batches.
//!
//! A node arms a flush on its first change of a turn and the flush runs once
//! the turn is over. What a "turn" is depends on the [`Scheduler`]; the
//! default [`MicrotaskQueue`] keeps a thread-local FIFO that is drained at the
//! end of [`turn`] or by an explicit [`run_microtasks`] call.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Runs tasks after the current unit of synchronous work.
///
/// Implementations must run every deferred task exactly once, in the order
/// it was deferred, and never while the code that deferred it is still on
/// the stack.
pub trait Scheduler {
    fn defer(&self, task: Task);
}

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Thread-local microtask queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrotaskQueue;

impl Scheduler for MicrotaskQueue {
    fn defer(&self, task: Task) {
        QUEUE.with(|q| q.borrow_mut().push_back(task));
    }
}

/// Drains the microtask queue, including tasks queued by running tasks.
///
/// Returns the number of tasks that ran.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    while let Some(task) = QUEUE.with(|q| q.borrow_mut().pop_front()) {
        task();
        ran += 1;
    }
    ran
}

/// Number of microtasks waiting to run on this thread.
pub fn pending_microtasks() -> usize {
    QUEUE.with(|q| q.borrow().len())
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> (Self, bool) {
        let outermost = DEPTH.with(|d| {
            let depth = d.get();
            d.set(depth + 1);
            depth == 0
        });
        (DepthGuard, outermost)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Runs `f` as one synchronous turn.
///
/// Work left over from before the turn is drained first so it cannot merge
/// into this turn's batches. Once `f` returns the queue is drained again,
/// delivering every batch armed during the turn. Nested calls only drain at
/// the outermost level.
pub fn turn<R>(f: impl FnOnce() -> R) -> R {
    let (guard, outermost) = DepthGuard::enter();
    if outermost {
        run_microtasks();
    }
    let out = f();
    drop(guard);
    if outermost {
        run_microtasks();
    }
    out
}

/// Shared scheduler handle stored in [`Options`](crate::Options).
#[derive(Clone)]
pub struct SchedulerRef(pub(crate) Rc<dyn Scheduler>);

impl SchedulerRef {
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self(Rc::new(scheduler))
    }

    pub(crate) fn defer(&self, task: Task) {
        self.0.defer(task);
    }
}

impl Default for SchedulerRef {
    fn default() -> Self {
        Self::new(MicrotaskQueue)
    }
}

impl fmt::Debug for SchedulerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SchedulerRef")
    }
}
