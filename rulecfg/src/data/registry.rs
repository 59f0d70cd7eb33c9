use std::{
    cell::{OnceCell, RefCell},
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use crate::{
    data::{
        item::{ConfigKind, Item, ItemDecl, ItemId},
        text::Text,
        tree::{GroupDecl, NodeKind, RuleDecl, RuleEffects, TabDecl, TreeNode},
    },
    error::{Error, Result},
    ident::RenderId,
    store::Store,
    style::{PageStyles, StyleHandle, StyleInjector},
    ui::{
        dom::Document,
        tooltip::{InlineTooltip, Tooltip},
    },
};

/// Context owning one rule tree and its collaborators.
///
/// Independent registries can coexist; each has its own tabs, key index and
/// document. Dropping a registry releases the store listeners it installed.
pub struct Registry {
    pub(crate) items: Vec<Item>,
    tabs: Vec<ItemId>,
    by_key: HashMap<String, ItemId>,
    by_render_id: HashMap<String, ItemId>,
    pub(crate) store: Rc<dyn Store>,
    pub(crate) styles: Rc<dyn StyleInjector>,
    pub(crate) tooltip: Rc<dyn Tooltip>,
    pub(crate) document: Rc<RefCell<Document>>,
    pub(crate) sheet: RefCell<Option<StyleHandle>>,
}

/// Declaration checked and converted, ready to be inserted without failing.
struct Prepared {
    id: Option<String>,
    template: Text,
    kind: ConfigKind,
    refs: Vec<(String, Prepared)>,
}

impl Prepared {
    fn from_decl(decl: ItemDecl) -> Result<Self> {
        let kind = decl.build_kind()?;
        let refs = decl
            .refs
            .into_iter()
            .map(|(name, d)| Ok((name, Prepared::from_decl(d)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: decl.id,
            template: decl.template,
            kind,
            refs,
        })
    }
}

impl Registry {
    /// Empty registry persisting values in `store`, with in-memory page
    /// styles and inline tooltips.
    pub fn new(store: impl Store + 'static) -> Self {
        Self {
            items: Vec::new(),
            tabs: Vec::new(),
            by_key: HashMap::new(),
            by_render_id: HashMap::new(),
            store: Rc::new(store),
            styles: Rc::new(PageStyles::new()),
            tooltip: Rc::new(InlineTooltip),
            document: Rc::new(RefCell::new(Document::new())),
            sheet: RefCell::new(None),
        }
    }

    /// Inject rule styles through `styles` instead.
    pub fn with_styles(mut self, styles: Rc<dyn StyleInjector>) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_tooltip(mut self, tooltip: Rc<dyn Tooltip>) -> Self {
        self.tooltip = tooltip;
        self
    }

    pub fn store(&self) -> &Rc<dyn Store> {
        &self.store
    }

    /// The document rendered nodes are created in.
    pub fn document(&self) -> Rc<RefCell<Document>> {
        self.document.clone()
    }

    /// The item behind `id`, or [`Error::UnknownItem`] for a foreign id.
    pub fn item(&self, id: ItemId) -> Result<&Item> {
        self.items
            .get(id.0)
            .ok_or_else(|| Error::UnknownItem(format!("{id:?}")))
    }

    /// Tabs in declaration order.
    pub fn tabs(&self) -> &[ItemId] {
        &self.tabs
    }

    /// Look up an item by its full dot-separated key.
    pub fn find(&self, key: &str) -> Option<ItemId> {
        self.by_key.get(key).copied()
    }

    pub fn find_by_render_id(&self, render_id: &str) -> Option<ItemId> {
        self.by_render_id.get(render_id).copied()
    }

    /// Tree data of a tab, group, rule or text node; `None` for plain items.
    pub fn node(&self, id: ItemId) -> Option<&TreeNode> {
        self.items.get(id.0).and_then(|i| i.node.as_ref())
    }

    pub fn node_kind(&self, id: ItemId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    /// Tree children in declaration order. Nested refs are not children.
    pub fn children(&self, id: ItemId) -> &[ItemId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Declare a free-standing config item outside the rule tree.
    pub fn declare_item(&mut self, decl: ItemDecl) -> Result<ItemId> {
        let prepared = Prepared::from_decl(decl)?;
        Ok(self.install(prepared, None, None))
    }

    /// Declare a tab and register it after the existing ones.
    pub fn declare_tab(&mut self, decl: TabDecl) -> Result<ItemId> {
        let mut item = decl.item;
        item.kind = Default::default();
        let prepared = Prepared::from_decl(item)?;
        let node = TreeNode::new(NodeKind::Tab, None, true, RuleEffects::default());
        let id = self.install(prepared, None, Some(node));
        self.tabs.push(id);
        Ok(id)
    }

    /// Declare a group under `parent`, which must be a tab.
    pub fn declare_group(&mut self, parent: ItemId, decl: GroupDecl) -> Result<ItemId> {
        let mut item = decl.item;
        self.expect_parent(parent, NodeKind::Tab, NodeKind::Group, &item)?;
        item.kind = Default::default();
        let prepared = Prepared::from_decl(item)?;
        let node = TreeNode::new(NodeKind::Group, Some(parent), true, RuleEffects::default());
        Ok(self.attach(parent, prepared, node))
    }

    /// Declare a rule under `parent`, which must be a group.
    pub fn declare_rule(&mut self, parent: ItemId, decl: RuleDecl) -> Result<ItemId> {
        self.declare_leaf(parent, decl, NodeKind::Rule)
    }

    /// Declare a text-only rule under `parent`, which must be a group.
    pub fn declare_text(&mut self, parent: ItemId, decl: RuleDecl) -> Result<ItemId> {
        self.declare_leaf(parent, decl, NodeKind::Text)
    }

    fn declare_leaf(&mut self, parent: ItemId, decl: RuleDecl, kind: NodeKind) -> Result<ItemId> {
        let RuleDecl {
            mut item,
            always,
            effects,
        } = decl;
        self.expect_parent(parent, NodeKind::Group, kind, &item)?;
        item.kind = Default::default();
        let always = always || kind == NodeKind::Text;
        let prepared = Prepared::from_decl(item)?;
        let node = TreeNode::new(kind, Some(parent), always, effects);
        let id = self.attach(parent, prepared, node);
        debug!("declared {} {}", kind.name(), self.items[id.0].describe());
        Ok(id)
    }

    fn expect_parent(
        &self,
        parent: ItemId,
        expected: NodeKind,
        child: NodeKind,
        decl: &ItemDecl,
    ) -> Result<()> {
        let found = match self.items.get(parent.0) {
            None => "nothing".to_string(),
            Some(item) => match &item.node {
                Some(node) if node.kind == expected => return Ok(()),
                Some(node) => format!("{} {}", node.kind.name(), item.describe()),
                None => format!("plain item {}", item.describe()),
            },
        };
        Err(Error::Structural {
            node: format!("{} {}", child.name(), decl.describe()),
            expected: expected.name(),
            found,
        })
    }

    fn attach(&mut self, parent: ItemId, prepared: Prepared, node: TreeNode) -> ItemId {
        let scope = self.items[parent.0].scope.clone();
        let id = self.install(prepared, scope.as_deref(), Some(node));
        if let Some(parent_node) = self.items[parent.0].node.as_mut() {
            parent_node.children.push(id);
        }
        id
    }

    /// Insert a prepared item and its refs. Cannot fail.
    fn install(&mut self, prepared: Prepared, scope: Option<&str>, node: Option<TreeNode>) -> ItemId {
        let key = match (&prepared.id, prepared.kind.is_configurable()) {
            (Some(local), true) => Some(match scope {
                Some(prefix) => format!("{prefix}.{local}"),
                None => local.clone(),
            }),
            _ => None,
        };
        let child_scope = key.clone().or_else(|| scope.map(str::to_string));
        let render_id = RenderId::next();

        let id = ItemId(self.items.len());
        self.by_render_id.insert(render_id.to_string(), id);
        if let Some(key) = &key {
            if self.by_key.contains_key(key) {
                warn!("duplicate item key `{key}`, lookups keep the first declaration");
            } else {
                self.by_key.insert(key.clone(), id);
            }
        }

        self.items.push(Item {
            id: prepared.id,
            key,
            scope: child_scope.clone(),
            render_id,
            kind: prepared.kind,
            template: prepared.template,
            refs: BTreeMap::new(),
            node,
            binding: OnceCell::new(),
        });

        for (name, child) in prepared.refs {
            let child_id = self.install(child, child_scope.as_deref(), None);
            self.items[id.0].refs.insert(name, child_id);
        }
        id
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for item in &mut self.items {
            if let Some(binding) = item.binding.take() {
                binding.release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::item::OptionDecl, store::MemoryStore};

    fn tree() -> (Registry, ItemId, ItemId) {
        let mut reg = Registry::new(MemoryStore::new());
        let tab = reg.declare_tab(TabDecl::new("Hide").with_id("hide")).unwrap();
        let group = reg
            .declare_group(tab, GroupDecl::new("Navigation").with_id("nav"))
            .unwrap();
        (reg, tab, group)
    }

    #[test]
    fn test_keys_follow_ancestor_ids() {
        let (mut reg, _, group) = tree();
        let rule = reg
            .declare_rule(
                group,
                RuleDecl::new("ads", "Hide ads {{size}}")
                    .with_ref("size", ItemDecl::number("size", "px")),
            )
            .unwrap();
        let item = reg.item(rule).unwrap();
        assert_eq!(item.key(), Some("hide.nav.ads"));

        let size = item.refs()["size"];
        assert_eq!(reg.item(size).unwrap().key(), Some("hide.nav.ads.size"));
        assert_eq!(reg.find("hide.nav.ads.size"), Some(size));
    }

    #[test]
    fn test_ancestors_without_id_are_skipped() {
        let mut reg = Registry::new(MemoryStore::new());
        let tab = reg.declare_tab(TabDecl::new("T")).unwrap();
        let group = reg.declare_group(tab, GroupDecl::new("G")).unwrap();
        let rule = reg.declare_rule(group, RuleDecl::new("r", "R")).unwrap();
        assert_eq!(reg.item(rule).unwrap().key(), Some("r"));
        assert_eq!(reg.item(tab).unwrap().key(), None);
    }

    #[test]
    fn test_group_requires_tab_parent() {
        let (mut reg, _, group) = tree();
        let before = reg.items.len();
        let err = reg.declare_group(group, GroupDecl::new("Nested")).unwrap_err();
        assert!(matches!(err, Error::Structural { expected: "tab", .. }));
        assert_eq!(reg.items.len(), before);
    }

    #[test]
    fn test_rule_requires_group_parent() {
        let (mut reg, tab, _) = tree();
        let before = reg.items.len();
        let err = reg.declare_rule(tab, RuleDecl::new("x", "X")).unwrap_err();
        assert!(matches!(err, Error::Structural { expected: "group", .. }));
        assert!(reg.find("hide.x").is_none());
        assert_eq!(reg.items.len(), before);

        let loose = reg.declare_item(ItemDecl::boolean("loose", "")).unwrap();
        assert!(matches!(
            reg.declare_rule(loose, RuleDecl::new("y", "Y")),
            Err(Error::Structural { .. })
        ));
        assert!(matches!(
            reg.declare_rule(ItemId(999), RuleDecl::new("z", "Z")),
            Err(Error::Structural { .. })
        ));
    }

    #[test]
    fn test_invalid_ref_leaves_no_partial_registration() {
        let (mut reg, _, group) = tree();
        let before = reg.items.len();
        let decl = RuleDecl::new("theme", "Theme {{ok}} {{bad}}")
            .with_ref("ok", ItemDecl::boolean("ok", ""))
            .with_ref("bad", ItemDecl::select("bad", "", vec![]));
        assert!(matches!(
            reg.declare_rule(group, decl),
            Err(Error::InvalidOptions { .. })
        ));
        assert_eq!(reg.items.len(), before);
        assert!(reg.children(group).is_empty());
    }

    #[test]
    fn test_tree_relations() {
        let (mut reg, tab, group) = tree();
        let a = reg.declare_rule(group, RuleDecl::new("a", "A")).unwrap();
        let t = reg.declare_text(group, RuleDecl::new("t", "Note")).unwrap();
        assert_eq!(reg.tabs(), &[tab]);
        assert_eq!(reg.children(tab), &[group]);
        assert_eq!(reg.children(group), &[a, t]);
        assert_eq!(reg.parent(a), Some(group));
        assert!(reg.node(t).unwrap().always());
        assert!(!reg.node(a).unwrap().always());
        assert!(reg.node(tab).unwrap().always());
        assert_eq!(reg.node_kind(t), Some(NodeKind::Text));
    }

    #[test]
    fn test_render_ids_resolve_back() {
        let mut reg = Registry::new(MemoryStore::new());
        let item = reg
            .declare_item(ItemDecl::select(
                "mode",
                "",
                vec![OptionDecl::new("a", "A"), OptionDecl::new("b", "B")],
            ))
            .unwrap();
        let rid = reg.item(item).unwrap().render_id().to_string();
        assert_eq!(reg.find_by_render_id(&rid), Some(item));
    }

    #[test]
    fn test_bubble_has_no_key() {
        let mut reg = Registry::new(MemoryStore::new());
        let bubble = reg
            .declare_item(ItemDecl::bubble("help").with_id("tip"))
            .unwrap();
        assert_eq!(reg.item(bubble).unwrap().key(), None);
    }
}
