//! Single-threaded events with owned subscriptions
//!
//! Subscribing returns a [`Subscription`]; dropping it unsubscribes. Emitting
//! snapshots the subscriber list first, so callbacks may subscribe or drop
//! subscriptions while the event is being delivered.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Owned handle of a registration, released when dropped
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    revoke: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(revoke: impl FnOnce() + 'static) -> Self {
        Self {
            revoke: Some(Box::new(revoke)),
        }
    }

    /// Release the registration now
    pub fn revoke(mut self) {
        if let Some(revoke) = self.revoke.take() {
            revoke();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            revoke();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.revoke.is_some())
            .finish()
    }
}

type Callback<T> = Rc<dyn Fn(&T)>;

struct SubscriberList<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

impl<T> SubscriberList<T> {
    fn prune(&mut self, subscriber_id: u64) {
        self.entries.retain(|(id, _)| *id != subscriber_id);
    }
}

/// Event delivering a `&T` payload to every subscriber
pub struct Event<T: 'static> {
    subscribers: Rc<RefCell<SubscriberList<T>>>,
}

impl<T: 'static> Event<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(SubscriberList {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut list = self.subscribers.borrow_mut();
            let id = list.next_id;
            list.next_id += 1;
            list.entries.push((id, Rc::new(callback)));
            id
        };
        let weak: Weak<RefCell<SubscriberList<T>>> = Rc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(list) = weak.upgrade() {
                list.borrow_mut().prune(id);
            }
        })
    }

    /// Call every subscriber, returns how many were called
    pub fn emit(&self, payload: &T) -> usize {
        let snapshot: Vec<Callback<T>> = self
            .subscribers
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in &snapshot {
            callback(payload);
        }
        snapshot.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().entries.len()
    }
}

impl<T: 'static> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}
