//! Persistent key-value store contract.
//!
//! The registry never persists anything itself. It talks to a [`Store`],
//! keyed by the dot-separated item path, and tolerates whatever raw values
//! the store hands back: stale or invalid entries are normalized and written
//! back on the next read.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::{Rc, Weak},
};

use serde_json::Value;

/// Callback invoked with `(new, old)` when a key changes.
pub type StoreCallback = Rc<dyn Fn(&Value, &Value)>;

/// Storage backend for item values.
pub trait Store {
    /// Read the raw value for `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write `value` under `key` and notify listeners of that key.
    fn set(&self, key: &str, value: Value);

    /// Subscribe to changes of `key`.
    ///
    /// The listener stays registered until [`Subscription::remove`] is called.
    fn add_listener(&self, key: &str, callback: StoreCallback) -> Subscription;
}

/// Handle to a store listener.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::remove`].
#[must_use = "listeners stay registered until `remove` is called"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap the closure that unregisters the listener.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Unregister the listener.
    pub fn remove(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Default)]
struct MemoryInner {
    values: RefCell<BTreeMap<String, Value>>,
    listeners: RefCell<Vec<(u64, String, StoreCallback)>>,
    next_listener: Cell<u64>,
}

/// In-process [`Store`] backed by a map.
///
/// Every `set` notifies the key's listeners, even when the value is unchanged.
/// Listeners are cloned out before dispatch, so they may read or write the
/// store themselves.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with `values`.
    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        let store = Self::default();
        store.inner.values.borrow_mut().extend(values);
        store
    }

    /// Copy of all stored values, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.inner.values.borrow().clone()
    }

    /// Number of registered listeners across all keys.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.inner.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let old = self
            .inner
            .values
            .borrow_mut()
            .insert(key.to_string(), value.clone())
            .unwrap_or(Value::Null);

        let callbacks: Vec<StoreCallback> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| k == key)
            .map(|(_, _, cb)| cb.clone())
            .collect();

        for cb in callbacks {
            cb(&value, &old);
        }
    }

    fn add_listener(&self, key: &str, callback: StoreCallback) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, key.to_string(), callback));

        let weak: Weak<MemoryInner> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(l, _, _)| *l != id);
            }
        })
    }
}
