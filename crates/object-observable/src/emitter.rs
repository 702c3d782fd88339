//! Listener lists backing a node's immediate and batched streams.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// Identifier returned when subscribing; pass it back to unsubscribe.
pub type ListenerId = u64;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Entry<T: ?Sized> {
    callback: Callback<T>,
    once: bool,
}

/// A single event stream.
///
/// Listeners run in subscription order. No internal borrow is held while a
/// listener runs, so listeners may subscribe, unsubscribe, mutate the graph
/// or be called again from inside themselves.
pub(crate) struct Emitter<T: ?Sized> {
    next_id: Cell<ListenerId>,
    listeners: RefCell<BTreeMap<ListenerId, Entry<T>>>,
}

impl<T: ?Sized> Emitter<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            listeners: RefCell::new(BTreeMap::new()),
        }
    }

    pub(crate) fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + 'static,
    {
        self.insert(Rc::new(listener), false)
    }

    pub(crate) fn once<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + 'static,
    {
        self.insert(Rc::new(listener), true)
    }

    fn insert(&self, callback: Callback<T>, once: bool) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id.saturating_add(1));
        self.listeners
            .borrow_mut()
            .insert(id, Entry { callback, once });
        id
    }

    pub(crate) fn off(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub(crate) fn emit(&self, event: &T) {
        let callbacks: Vec<Callback<T>> = {
            let mut listeners = self.listeners.borrow_mut();
            let snapshot = listeners
                .values()
                .map(|entry| Rc::clone(&entry.callback))
                .collect();
            listeners.retain(|_, entry| !entry.once);
            snapshot
        };
        for callback in callbacks {
            callback(event);
        }
    }
}

/// Adapts a stateful listener to the emitter's `Fn` callbacks.
///
/// An event that arrives while the listener is still running (because the
/// listener itself caused it) is queued and delivered right after the
/// running call returns, so every event is seen once and in order.
pub(crate) fn queued<T, F>(listener: F) -> impl Fn(&T) + 'static
where
    T: ToOwned + ?Sized + 'static,
    T::Owned: 'static,
    F: FnMut(&T) + 'static,
{
    let listener = RefCell::new(listener);
    let backlog: RefCell<VecDeque<T::Owned>> = RefCell::new(VecDeque::new());
    move |event: &T| {
        let Ok(mut run) = listener.try_borrow_mut() else {
            tracing::trace!("listener busy; queuing event");
            backlog.borrow_mut().push_back(T::to_owned(event));
            return;
        };
        (&mut *run)(event);
        loop {
            let next = backlog.borrow_mut().pop_front();
            let Some(next) = next else {
                break;
            };
            (&mut *run)(<T::Owned as std::borrow::Borrow<T>>::borrow(&next));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Weak;

    #[test]
    fn listeners_run_in_subscription_order() {
        let emitter: Emitter<u32> = Emitter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Rc::clone(&seen);
            emitter.on(move |v: &u32| seen.borrow_mut().push(format!("{tag}{v}")));
        }
        emitter.emit(&1);
        assert_eq!(*seen.borrow(), vec!["a1", "b1"]);
    }

    #[test]
    fn off_removes_listener() {
        let emitter: Emitter<u32> = Emitter::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let id = emitter.on(move |_| h.set(h.get() + 1));
        emitter.emit(&0);
        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        emitter.emit(&0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn once_fires_a_single_time() {
        let emitter: Emitter<u32> = Emitter::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        emitter.once(move |_| h.set(h.get() + 1));
        emitter.emit(&0);
        emitter.emit(&0);
        assert_eq!(hits.get(), 1);
        assert_eq!(emitter.len(), 0);
    }

    #[test]
    fn unsized_payloads() {
        let emitter: Emitter<[u32]> = Emitter::new();
        let total = Rc::new(Cell::new(0));
        let t = Rc::clone(&total);
        emitter.on(move |batch: &[u32]| t.set(batch.iter().sum()));
        emitter.emit(&[1, 2, 3]);
        assert_eq!(total.get(), 6);
    }

    #[test]
    fn plain_callbacks_may_reenter() {
        let emitter: Rc<Emitter<u32>> = Rc::new(Emitter::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let weak: Weak<Emitter<u32>> = Rc::downgrade(&emitter);
        let log = Rc::clone(&seen);
        emitter.on(move |v: &u32| {
            log.borrow_mut().push(*v);
            if *v < 3 {
                if let Some(emitter) = weak.upgrade() {
                    emitter.emit(&(v + 1));
                }
            }
        });
        emitter.emit(&1);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn once_listener_is_removed_before_it_runs() {
        let emitter: Rc<Emitter<u32>> = Rc::new(Emitter::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let weak = Rc::downgrade(&emitter);
        let log = Rc::clone(&seen);
        emitter.once(queued(move |v: &u32| {
            log.borrow_mut().push(format!("start{v}"));
            if *v == 1 {
                if let Some(emitter) = weak.upgrade() {
                    emitter.emit(&2);
                }
            }
            log.borrow_mut().push(format!("end{v}"));
        }));
        emitter.emit(&1);
        assert_eq!(*seen.borrow(), vec!["start1", "end1"]);
    }

    #[test]
    fn queued_listener_keeps_order() {
        let emitter: Rc<Emitter<u32>> = Rc::new(Emitter::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let weak = Rc::downgrade(&emitter);
        let log = Rc::clone(&seen);
        emitter.on(queued(move |v: &u32| {
            log.borrow_mut().push(format!("start{v}"));
            if *v == 1 {
                if let Some(emitter) = weak.upgrade() {
                    emitter.emit(&2);
                    emitter.emit(&3);
                }
            }
            log.borrow_mut().push(format!("end{v}"));
        }));
        emitter.emit(&1);
        assert_eq!(
            *seen.borrow(),
            vec!["start1", "end1", "start2", "end2", "start3", "end3"]
        );
    }
}
