//! Rule trees declared as data.
//!
//! # File Format
//!
//! ```toml
//! [[tabs]]
//! id = "page"
//! title = "Page"
//!
//! [[tabs.groups]]
//! id = "layout"
//! title = "Layout"
//!
//! [[tabs.groups.rules]]
//! id = "wide"
//! text = "Wide layout, max {{width}} px"
//! acss = "main { max-width: none }"
//!
//! [tabs.groups.rules.refs.width]
//! id = "width"
//! type = "range"
//! min = 800
//! max = 2400
//! step = 100
//! ```
//!
//! Hooks and computed text cannot be expressed here; declare such rules in
//! code with [`RuleDecl`].

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    data::{
        item::{ItemDecl, ItemId, KindDecl, NumberBounds, OptionDecl},
        registry::Registry,
        tree::{GroupDecl, RuleDecl, TabDecl},
    },
    error::Result,
};

/// Root of a declared rule tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TreeSpec {
    /// Tabs in display order.
    #[serde(default)]
    pub tabs: Vec<TabSpec>,
}

/// A tab holding groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TabSpec {
    /// Key segment prefixed to everything below the tab.
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

/// A group holding rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GroupSpec {
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// A toggleable rule, or a text note when `note` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RuleSpec {
    pub id: Option<String>,
    /// Label template.
    #[serde(default)]
    pub text: String,
    /// Permanently enabled, shown without a checkbox.
    #[serde(default)]
    pub always: bool,
    /// Text-only node.
    #[serde(default)]
    pub note: bool,
    /// Style applied whether or not the rule is enabled.
    pub css: Option<String>,
    /// Style applied only while the rule is enabled.
    pub acss: Option<String>,
    /// Nested items used as `{{name}}` in `text`.
    #[serde(default)]
    pub refs: BTreeMap<String, ItemSpec>,
}

/// A nested config item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ItemSpec {
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub kind: KindSpec,
    #[serde(default)]
    pub refs: BTreeMap<String, ItemSpec>,
}

/// Kind of a nested item, selected by its `type` field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KindSpec {
    Boolean,
    Select { options: Vec<OptionSpec> },
    Number(BoundsSpec),
    Range(BoundsSpec),
    Bubble,
}

/// Bounds of number and range items. Missing values use the defaults
/// `min = 0`, unbounded `max`, no step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BoundsSpec {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

/// One option of a select item. Values must be strings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct OptionSpec {
    pub value: Value,
    /// Shown text; defaults to the value.
    pub label: Option<String>,
}

impl BoundsSpec {
    fn bounds(&self) -> NumberBounds {
        let default = NumberBounds::default();
        NumberBounds {
            min: self.min.unwrap_or(default.min),
            max: self.max.unwrap_or(default.max),
            step: self.step,
        }
    }
}

impl ItemSpec {
    pub fn to_decl(&self) -> ItemDecl {
        let kind = match &self.kind {
            KindSpec::Boolean => KindDecl::Boolean,
            KindSpec::Select { options } => KindDecl::Select(
                options
                    .iter()
                    .map(|o| {
                        let label = o.label.clone().unwrap_or_else(|| match &o.value {
                            Value::String(s) => s.clone(),
                            v => v.to_string(),
                        });
                        OptionDecl::new(o.value.clone(), label)
                    })
                    .collect(),
            ),
            KindSpec::Number(b) => KindDecl::Number(b.bounds()),
            KindSpec::Range(b) => KindDecl::Range(b.bounds()),
            KindSpec::Bubble => KindDecl::Bubble,
        };
        ItemDecl {
            id: self.id.clone(),
            template: self.text.clone().into(),
            kind,
            refs: refs_to_decls(&self.refs),
        }
    }
}

fn refs_to_decls(refs: &BTreeMap<String, ItemSpec>) -> Vec<(String, ItemDecl)> {
    refs.iter()
        .map(|(name, spec)| (name.clone(), spec.to_decl()))
        .collect()
}

impl RuleSpec {
    pub fn to_decl(&self) -> RuleDecl {
        let mut decl = match &self.id {
            Some(id) => RuleDecl::new(id.clone(), self.text.clone()),
            None => RuleDecl::always(self.text.clone()),
        };
        decl.always |= self.always;
        decl.item.refs = refs_to_decls(&self.refs);
        if let Some(css) = &self.css {
            decl = decl.css(css.clone());
        }
        if let Some(acss) = &self.acss {
            decl = decl.acss(acss.clone());
        }
        decl
    }
}

impl TreeSpec {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a `.toml` or `.json` tree file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match ext {
            "toml" => Self::from_toml_str(&content),
            "json" => Self::from_json_str(&content),
            _ => bail!("Unsupported tree file extension: {ext:?}"),
        }
        .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// JSON Schema describing the file format.
    pub fn schema() -> anyhow::Result<Value> {
        Ok(serde_json::to_value(schemars::schema_for!(TreeSpec))?)
    }
}

impl Registry {
    /// Declare every tab, group and rule of `spec`, returning the tab ids.
    ///
    /// Declarations are atomic one by one: on error, nodes declared before
    /// the failing one stay registered.
    pub fn load_spec(&mut self, spec: &TreeSpec) -> Result<Vec<ItemId>> {
        let mut tabs = Vec::with_capacity(spec.tabs.len());
        for tab_spec in &spec.tabs {
            let mut tab_decl = TabDecl::new(tab_spec.title.clone());
            tab_decl.item.id = tab_spec.id.clone();
            let tab = self.declare_tab(tab_decl)?;

            for group_spec in &tab_spec.groups {
                let mut group_decl = GroupDecl::new(group_spec.title.clone());
                group_decl.item.id = group_spec.id.clone();
                let group = self.declare_group(tab, group_decl)?;

                for rule_spec in &group_spec.rules {
                    if rule_spec.note {
                        self.declare_text(group, rule_spec.to_decl())?;
                    } else {
                        self.declare_rule(group, rule_spec.to_decl())?;
                    }
                }
            }
            tabs.push(tab);
        }
        Ok(tabs)
    }
}
