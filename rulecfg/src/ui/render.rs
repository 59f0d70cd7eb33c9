//! Template-driven rendering of items into the registry's document.

use crate::{
    data::{
        item::{ConfigKind, ItemId},
        registry::Registry,
    },
    error::Result,
    ui::{
        dom::{Document, NodeId},
        template::{Mode, TokenKind, decode_text, tokenize},
        widget::{RENDER_ID_ATTR, build_widgets},
    },
};

/// Class carried by every item container.
pub const ITEM_CLASS: &str = "rc-item";

impl Registry {
    /// Render `id` with its widgets and nested items.
    ///
    /// The returned node is detached; append it under the document body to
    /// make it live.
    pub fn render(&self, id: ItemId) -> Result<NodeId> {
        let mut doc = self.document.borrow_mut();
        self.render_node(&mut doc, id, Mode::Recursive)
    }

    /// Plain-text summary of `id`'s template, with nested items contributing
    /// their own text. No widgets, no splitters, no rule references.
    pub fn render_text(&self, id: ItemId) -> Result<String> {
        Ok(self.collect_text(id)?.trim().to_string())
    }

    /// Free a node returned by [`Registry::render`] or
    /// [`Registry::render_panel`], together with everything rendered inside it.
    ///
    /// Returns the number of document nodes released. Handles into the freed
    /// subtree go stale.
    pub fn dispose(&self, node: NodeId) -> usize {
        self.document.borrow_mut().remove(node)
    }

    /// Render the rules selected from `base` as a settings panel, grouped
    /// under their tab and group headings. An empty `base` means all tabs.
    pub fn render_panel(&self, base: &[ItemId]) -> Result<NodeId> {
        let rules = if base.is_empty() {
            self.query_all()
        } else {
            self.query(base)
        };

        let mut doc = self.document.borrow_mut();
        let panel = doc.create_element("div");
        doc.set_attr(panel, "class", "rc-panel");

        let mut current_tab: Option<(ItemId, NodeId)> = None;
        let mut current_group: Option<(ItemId, NodeId)> = None;
        for rule in rules {
            let group = self.parent(rule);
            let tab = group.and_then(|g| self.parent(g));
            let (Some(group), Some(tab)) = (group, tab) else {
                let node = self.render_node(&mut doc, rule, Mode::Recursive)?;
                doc.append_child(panel, node);
                continue;
            };

            let section = match current_tab {
                Some((t, node)) if t == tab => node,
                _ => {
                    let node = self.heading(&mut doc, tab, "section", "rc-tab", "h2")?;
                    doc.append_child(panel, node);
                    current_tab = Some((tab, node));
                    current_group = None;
                    node
                }
            };
            let fieldset = match current_group {
                Some((g, node)) if g == group => node,
                _ => {
                    let node = self.heading(&mut doc, group, "fieldset", "rc-group", "legend")?;
                    doc.append_child(section, node);
                    current_group = Some((group, node));
                    node
                }
            };
            let node = self.render_node(&mut doc, rule, Mode::Recursive)?;
            doc.append_child(fieldset, node);
        }
        Ok(panel)
    }

    fn heading(
        &self,
        doc: &mut Document,
        id: ItemId,
        tag: &str,
        class: &str,
        title_tag: &str,
    ) -> Result<NodeId> {
        let node = doc.create_element(tag);
        doc.set_attr(node, "class", class);
        doc.set_attr(node, RENDER_ID_ATTR, self.item(id)?.render_id.as_str());
        let title = doc.create_element(title_tag);
        let text = doc.create_text(&self.render_text(id)?);
        doc.append_child(title, text);
        doc.append_child(node, title);
        Ok(node)
    }

    pub(crate) fn render_node(&self, doc: &mut Document, id: ItemId, mode: Mode) -> Result<NodeId> {
        let item = self.item(id)?;
        let kind_class = match &item.node {
            Some(node) => node.kind.name(),
            None => item.kind.name(),
        };

        if let ConfigKind::Bubble = item.kind {
            let container = doc.create_element("span");
            doc.set_attr(container, "class", &format!("{ITEM_CLASS} rc-bubble"));
            doc.set_attr(container, RENDER_ID_ATTR, item.render_id.as_str());
            let icon = doc.create_element("span");
            doc.set_attr(icon, "class", "rc-bubble-icon");
            doc.set_attr(icon, "tabindex", "0");
            let mark = doc.create_text("?");
            doc.append_child(icon, mark);
            doc.append_child(container, icon);

            let content = doc.create_element("div");
            doc.set_attr(content, "class", "rc-bubble-content");
            self.render_template(doc, id, content, mode)?;
            self.tooltip.attach(doc, content, icon);
            return Ok(container);
        }

        let container = doc.create_element("div");
        doc.set_attr(container, "class", &format!("{ITEM_CLASS} rc-{kind_class}"));
        doc.set_attr(container, RENDER_ID_ATTR, item.render_id.as_str());
        let (first, last) = self.render_template(doc, id, container, mode)?;

        let always = item.node.as_ref().is_some_and(|n| n.always);
        match &item.kind {
            ConfigKind::Boolean if always => {}
            ConfigKind::Boolean => {
                let value = self.get(id)?;
                for w in build_widgets(doc, &item.render_id, &item.kind, &value) {
                    doc.prepend_child(first, w);
                }
            }
            kind => {
                let value = self.get(id)?;
                for w in build_widgets(doc, &item.render_id, kind, &value) {
                    doc.append_child(last, w);
                }
            }
        }
        Ok(container)
    }

    /// Render the template of `id` into `parent` as a run of labels.
    ///
    /// Returns the first and last label.
    fn render_template(
        &self,
        doc: &mut Document,
        id: ItemId,
        parent: NodeId,
        mode: Mode,
    ) -> Result<(NodeId, NodeId)> {
        let item = self.item(id)?;
        let template = item.template.resolve();

        let first = doc.create_element("label");
        doc.append_child(parent, first);
        let mut label = first;

        for token in tokenize(&template, mode) {
            match token.kind {
                TokenKind::Splitter => {
                    if token.value == "||" {
                        let br = doc.create_element("br");
                        doc.append_child(parent, br);
                    }
                    label = doc.create_element("label");
                    doc.append_child(parent, label);
                }
                TokenKind::Child => match item.refs.get(token.value) {
                    Some(child) => {
                        let node = self.render_node(doc, *child, Mode::Normal)?;
                        doc.append_child(label, node);
                    }
                    None => warn!("{}: no child named `{}`", item.describe(), token.value),
                },
                TokenKind::Rule => {
                    let rule = self
                        .find(token.value)
                        .filter(|r| self.node_kind(*r).is_some_and(|k| k.is_rule()));
                    match rule {
                        Some(rule) => {
                            let node = self.render_node(doc, rule, Mode::Normal)?;
                            doc.append_child(label, node);
                        }
                        None => warn!("{}: no rule registered as `{}`", item.describe(), token.value),
                    }
                }
                TokenKind::Text => {
                    let text = doc.create_text(decode_text(token.value));
                    doc.append_child(label, text);
                }
            }
        }
        Ok((first, label))
    }

    fn collect_text(&self, id: ItemId) -> Result<String> {
        let item = self.item(id)?;
        let mut out = String::new();
        for token in tokenize(&item.template.resolve(), Mode::Text) {
            match token.kind {
                TokenKind::Child => {
                    if let Some(child) = item.refs.get(token.value) {
                        out.push_str(&self.collect_text(*child)?);
                    }
                }
                TokenKind::Text => out.push_str(decode_text(token.value)),
                TokenKind::Splitter | TokenKind::Rule => {}
            }
        }
        Ok(out)
    }
}
