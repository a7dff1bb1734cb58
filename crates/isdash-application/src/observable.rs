//! Observable values.
//!
//! An `Observable` holds a value that only its owner mutates. Readers either
//! register a listener callback or take a `watch` receiver for async code.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::watch;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: u64,
    entries: BTreeMap<u64, Listener<T>>,
}

/// A value with change notification.
pub struct Observable<T: Clone + Send + Sync + 'static> {
    initial: T,
    sender: watch::Sender<T>,
    listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial.clone());
        Self {
            initial,
            sender,
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Replaces the value and notifies every listener.
    pub fn set(&self, value: T) {
        self.store(value);
        self.notify();
    }

    /// Mutates the value in place and notifies every listener.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.modify(f);
        self.notify();
    }

    /// Replaces the value without running listeners. Watch receivers see it
    /// immediately; call `notify` once the owner has released its own locks.
    pub(crate) fn store(&self, value: T) {
        self.sender.send_replace(value);
    }

    pub(crate) fn modify(&self, f: impl FnOnce(&mut T)) {
        self.sender.send_modify(f);
    }

    /// Runs every listener with the current value.
    pub(crate) fn notify(&self) {
        // Listeners run outside the lock so they may subscribe or unsubscribe.
        let listeners: Vec<Listener<T>> = lock(&self.listeners).entries.values().cloned().collect();
        if listeners.is_empty() {
            return;
        }
        let value = self.get();
        for listener in listeners {
            listener(&value);
        }
    }

    /// Reads the current value without cloning it.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.sender.borrow())
    }

    /// Restores the value given at construction.
    pub fn reset(&self) {
        self.set(self.initial.clone());
    }

    /// Registers `listener`, calling it right away with the current value.
    ///
    /// The listener stays registered until the returned `Subscription` is
    /// dropped or `unsubscribe`d.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let listener: Listener<T> = Arc::new(listener);
        let id = {
            let mut listeners = lock(&self.listeners);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.insert(id, listener.clone());
            id
        };
        listener(&self.get());

        let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                lock(&listeners).entries.remove(&id);
            }
        })
    }

    /// Returns a receiver for async consumers.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }
}

fn lock<T>(listeners: &Mutex<Listeners<T>>) -> MutexGuard<'_, Listeners<T>> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle returned by `Observable::subscribe`.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
