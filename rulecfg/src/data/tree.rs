use std::{cell::Cell, fmt, rc::Rc};

use crate::data::{
    item::{ItemDecl, ItemId},
    registry::Registry,
    text::Text,
};

/// Side effect run once when a rule executes.
pub type RuleHook = Rc<dyn Fn(&Registry, ItemId) -> anyhow::Result<()>>;

/// Position of a node in the Tab → Group → Rule hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Tab,
    Group,
    Rule,
    /// A rule that only shows text; always enabled.
    Text,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Tab => "tab",
            NodeKind::Group => "group",
            NodeKind::Rule => "rule",
            NodeKind::Text => "text",
        }
    }

    /// Tabs and groups hold children; rules and text nodes are leaves.
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Tab | NodeKind::Group)
    }

    pub fn is_rule(&self) -> bool {
        matches!(self, NodeKind::Rule | NodeKind::Text)
    }
}

/// Styles and hooks applied when a rule executes.
#[derive(Clone, Default)]
pub struct RuleEffects {
    /// Style text appended whether or not the rule is enabled.
    pub css: Option<Text>,
    /// Style text appended only when the rule is enabled.
    pub acss: Option<Text>,
    pub init: Option<RuleHook>,
    /// Hook run only when the rule is enabled.
    pub ainit: Option<RuleHook>,
}

impl fmt::Debug for RuleEffects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEffects")
            .field("css", &self.css)
            .field("acss", &self.acss)
            .field("init", &self.init.is_some())
            .field("ainit", &self.ainit.is_some())
            .finish()
    }
}

/// Tree relations of an item that is a tab, group, rule or text node.
#[derive(Debug)]
pub struct TreeNode {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<ItemId>,
    pub(crate) children: Vec<ItemId>,
    pub(crate) always: bool,
    pub(crate) effects: RuleEffects,
    pub(crate) executed: Cell<bool>,
}

impl TreeNode {
    pub(crate) fn new(kind: NodeKind, parent: Option<ItemId>, always: bool, effects: RuleEffects) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            always,
            effects,
            executed: Cell::new(false),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    /// Permanently enabled, rendered without a checkbox.
    pub fn always(&self) -> bool {
        self.always
    }

    pub fn executed(&self) -> bool {
        self.executed.get()
    }
}

/// Declaration of a tab.
#[derive(Debug, Clone, Default)]
pub struct TabDecl {
    pub item: ItemDecl,
}

impl TabDecl {
    pub fn new(title: impl Into<Text>) -> Self {
        Self {
            item: ItemDecl::new(Default::default(), title),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.item.id = Some(id.into());
        self
    }
}

/// Declaration of a group; its parent must be a tab.
#[derive(Debug, Clone, Default)]
pub struct GroupDecl {
    pub item: ItemDecl,
}

impl GroupDecl {
    pub fn new(title: impl Into<Text>) -> Self {
        Self {
            item: ItemDecl::new(Default::default(), title),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.item.id = Some(id.into());
        self
    }
}

/// Declaration of a rule; its parent must be a group.
#[derive(Debug, Clone, Default)]
pub struct RuleDecl {
    pub item: ItemDecl,
    pub always: bool,
    pub effects: RuleEffects,
}

impl RuleDecl {
    /// A toggleable rule persisted under `id`.
    pub fn new(id: impl Into<String>, template: impl Into<Text>) -> Self {
        Self {
            item: ItemDecl::boolean(id, template),
            ..Default::default()
        }
    }

    /// A rule without its own toggle.
    pub fn always(template: impl Into<Text>) -> Self {
        Self {
            item: ItemDecl::new(Default::default(), template),
            always: true,
            ..Default::default()
        }
    }

    pub fn with_ref(mut self, name: impl Into<String>, item: ItemDecl) -> Self {
        self.item = self.item.with_ref(name, item);
        self
    }

    pub fn css(mut self, css: impl Into<Text>) -> Self {
        self.effects.css = Some(css.into());
        self
    }

    pub fn acss(mut self, css: impl Into<Text>) -> Self {
        self.effects.acss = Some(css.into());
        self
    }

    pub fn init(mut self, hook: impl Fn(&Registry, ItemId) -> anyhow::Result<()> + 'static) -> Self {
        self.effects.init = Some(Rc::new(hook));
        self
    }

    pub fn ainit(mut self, hook: impl Fn(&Registry, ItemId) -> anyhow::Result<()> + 'static) -> Self {
        self.effects.ainit = Some(Rc::new(hook));
        self
    }
}
