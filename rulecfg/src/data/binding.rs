//! Lazy connection between an item and its slot in the store.

use std::rc::Rc;

use serde_json::Value;

use crate::{
    data::{
        item::{ItemId, truthy},
        registry::Registry,
    },
    error::{Error, Result},
    store::Subscription,
    ui::widget::sync_listener,
};

/// Created on an item's first config access; at most one per item.
///
/// Holds the store subscription that keeps every rendered instance of the
/// item in sync with the stored value.
#[derive(Debug)]
pub struct Binding {
    key: String,
    sync: Subscription,
}

impl Binding {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn release(self) {
        self.sync.remove();
    }
}

impl Registry {
    pub(crate) fn binding(&self, id: ItemId) -> Result<&Binding> {
        let item = self.item(id)?;
        if let Some(binding) = item.binding.get() {
            return Ok(binding);
        }
        let key = item.key.clone().ok_or_else(|| Error::MissingId {
            render_id: item.render_id.to_string(),
        })?;
        let sync = self.store.add_listener(
            &key,
            sync_listener(
                Rc::downgrade(&self.document),
                item.render_id.clone(),
                item.kind.clone(),
            ),
        );
        debug!("bound {} to `{key}`", item.render_id);
        Ok(item.binding.get_or_init(|| Binding { key, sync }))
    }

    /// Read the item's value, normalized.
    ///
    /// A stored value that does not survive normalization is replaced by the
    /// normalized one, so stale or invalid entries heal on read.
    pub fn get(&self, id: ItemId) -> Result<Value> {
        let binding = self.binding(id)?;
        let raw = self.store.get(&binding.key).unwrap_or(Value::Null);
        let value = self.items[id.0].kind.normalize(&raw);
        if value != raw {
            debug!("rewriting `{}`: {raw} normalizes to {value}", binding.key);
            self.store.set(&binding.key, value.clone());
        }
        Ok(value)
    }

    /// Normalize and store `value`, returning what was stored.
    ///
    /// Every rendered instance of the item is resynced through the store's
    /// change notification.
    pub fn set(&self, id: ItemId, value: impl Into<Value>) -> Result<Value> {
        let binding = self.binding(id)?;
        let value = self.items[id.0].kind.normalize(&value.into());
        self.store.set(&binding.key, value.clone());
        Ok(value)
    }

    /// Subscribe to value changes of an item with `(new, old)`.
    ///
    /// The callback must not hold on to rendered nodes; release it with
    /// [`Subscription::remove`].
    pub fn add_listener(
        &self,
        id: ItemId,
        callback: impl Fn(&Value, &Value) + 'static,
    ) -> Result<Subscription> {
        let binding = self.binding(id)?;
        Ok(self.store.add_listener(&binding.key, Rc::new(callback)))
    }

    /// `always` nodes are enabled unconditionally; anything else follows its value.
    pub fn is_enabled(&self, id: ItemId) -> Result<bool> {
        if self.node(id).is_some_and(|n| n.always) {
            return Ok(true);
        }
        Ok(truthy(&self.get(id)?))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        data::{
            item::{ItemDecl, OptionDecl},
            tree::{GroupDecl, RuleDecl, TabDecl},
        },
        store::{MemoryStore, Store},
    };
    use serde_json::json;

    #[test]
    fn test_missing_store_value_reads_initial() {
        let store = MemoryStore::new();
        let mut reg = Registry::new(store.clone());
        let item = reg.declare_item(ItemDecl::number("n", "").min(5.0)).unwrap();
        assert_eq!(reg.get(item).unwrap(), json!(5));
        assert_eq!(store.get("n"), Some(json!(5)));
    }

    #[test]
    fn test_get_heals_invalid_stored_value() {
        let store = MemoryStore::with_values([("mode".to_string(), json!("gone"))]);
        let mut reg = Registry::new(store.clone());
        let item = reg
            .declare_item(ItemDecl::select(
                "mode",
                "",
                vec![OptionDecl::new("a", "A"), OptionDecl::new("b", "B")],
            ))
            .unwrap();
        assert_eq!(reg.get(item).unwrap(), json!("a"));
        assert_eq!(store.get("mode"), Some(json!("a")));
    }

    #[test]
    fn test_valid_value_is_not_rewritten() {
        let store = MemoryStore::with_values([("flag".to_string(), json!(true))]);
        let mut reg = Registry::new(store.clone());
        let item = reg.declare_item(ItemDecl::boolean("flag", "")).unwrap();
        let writes = Rc::new(RefCell::new(0));
        let w = writes.clone();
        let _sub = store.add_listener("flag", Rc::new(move |_, _| *w.borrow_mut() += 1));
        assert_eq!(reg.get(item).unwrap(), json!(true));
        assert_eq!(*writes.borrow(), 0);
    }

    #[test]
    fn test_set_then_get_round_trips_normalized() {
        let mut reg = Registry::new(MemoryStore::new());
        let item = reg
            .declare_item(ItemDecl::range("r", "").min(0.0).max(10.0).step(2.0))
            .unwrap();
        assert_eq!(reg.set(item, 7).unwrap(), json!(6));
        assert_eq!(reg.get(item).unwrap(), json!(6));
        assert_eq!(reg.set(item, "99").unwrap(), json!(10));
    }

    #[test]
    fn test_missing_id() {
        let mut reg = Registry::new(MemoryStore::new());
        let anon = reg.declare_item(ItemDecl::new(Default::default(), "x")).unwrap();
        assert!(matches!(reg.get(anon), Err(Error::MissingId { .. })));
        assert!(matches!(reg.set(anon, true), Err(Error::MissingId { .. })));
        assert!(matches!(
            reg.add_listener(anon, |_, _| {}),
            Err(Error::MissingId { .. })
        ));

        let bubble = reg.declare_item(ItemDecl::bubble("tip").with_id("b")).unwrap();
        assert!(matches!(reg.get(bubble), Err(Error::MissingId { .. })));
    }

    #[test]
    fn test_one_binding_per_item() {
        let store = MemoryStore::new();
        let mut reg = Registry::new(store.clone());
        let item = reg.declare_item(ItemDecl::boolean("b", "")).unwrap();
        reg.get(item).unwrap();
        reg.set(item, true).unwrap();
        reg.get(item).unwrap();
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn test_listener_receives_new_and_old() {
        let mut reg = Registry::new(MemoryStore::new());
        let item = reg.declare_item(ItemDecl::boolean("b", "")).unwrap();
        reg.get(item).unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let sub = reg
            .add_listener(item, move |new, old| {
                sink.borrow_mut().push((new.clone(), old.clone()))
            })
            .unwrap();
        reg.set(item, 1).unwrap();
        sub.remove();
        reg.set(item, false).unwrap();

        assert_eq!(*calls.borrow(), vec![(json!(true), json!(false))]);
    }

    #[test]
    fn test_enabled_state() {
        let mut reg = Registry::new(MemoryStore::new());
        let tab = reg.declare_tab(TabDecl::new("T")).unwrap();
        let group = reg.declare_group(tab, GroupDecl::new("G")).unwrap();
        let rule = reg.declare_rule(group, RuleDecl::new("r", "R")).unwrap();
        let note = reg.declare_text(group, RuleDecl::always("note")).unwrap();

        assert!(!reg.is_enabled(rule).unwrap());
        reg.set(rule, true).unwrap();
        assert!(reg.is_enabled(rule).unwrap());
        assert!(reg.is_enabled(note).unwrap());
        assert!(reg.is_enabled(tab).unwrap());
    }

    #[test]
    fn test_drop_releases_sync_listeners() {
        let store = MemoryStore::new();
        {
            let mut reg = Registry::new(store.clone());
            let a = reg.declare_item(ItemDecl::boolean("a", "")).unwrap();
            let b = reg.declare_item(ItemDecl::boolean("b", "")).unwrap();
            reg.get(a).unwrap();
            reg.get(b).unwrap();
            assert_eq!(store.listener_count(), 2);
        }
        assert_eq!(store.listener_count(), 0);
    }
}
