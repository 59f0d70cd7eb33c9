//! Minimal arena DOM the renderer builds into.
//!
//! Detaching a subtree only disconnects it from `body`; [`Document::remove`]
//! frees its slots for reuse. Queries that look for "live" instances only see
//! connected nodes.

use std::fmt::Write;

/// Handle to a node of a [`Document`].
///
/// Handles to removed nodes go stale: reads return nothing and writes are
/// ignored, even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// Element data. `value` and `checked` are widget properties, kept apart from
/// attributes like in a browser DOM.
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    attrs: Vec<(String, String)>,
    /// Current widget value of inputs and selects.
    pub value: String,
    /// Checked state of checkboxes.
    pub checked: bool,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Whether the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Tree of element and text nodes rooted at `body`.
#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

const VOID_TAGS: &[&str] = &["br", "input"];

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            body: NodeId {
                index: 0,
                generation: 0,
            },
        };
        doc.body = doc.create_element("body");
        doc
    }

    /// Root every live node hangs under.
    pub fn body(&self) -> NodeId {
        self.body
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Some(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = node;
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node,
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(Element {
            tag: tag.to_string(),
            ..Default::default()
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    /// Whether `node` still refers to a node of this document.
    pub fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    /// Number of nodes currently allocated, `body` included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.node(node).map(|n| &n.data)
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match self.data(node)? {
            NodeData::Element(e) => Some(e),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element(e) => Some(e),
            NodeData::Text(_) => None,
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.attr(name))
    }

    /// Set an attribute; ignored on text nodes.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(e) = self.element_mut(node) {
            e.set_attr(name, value);
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Remove `node` from its parent, keeping its subtree intact.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.node_mut(node).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != node);
        }
    }

    /// Detach `node` and free it with its whole subtree. `body` is never freed.
    ///
    /// Returns the number of nodes freed.
    pub fn remove(&mut self, node: NodeId) -> usize {
        if node == self.body || !self.contains(node) {
            return 0;
        }
        self.detach(node);
        let doomed = self.descendants(node);
        for id in &doomed {
            let slot = &mut self.slots[id.index];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
        doomed.len()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, child, None);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, child, Some(0));
    }

    fn insert_child(&mut self, parent: NodeId, child: NodeId, at: Option<usize>) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        if let Some(p) = self.node_mut(parent) {
            match at {
                Some(i) => p.children.insert(i, child),
                None => p.children.push(child),
            }
        }
    }

    /// Whether `node` is reachable from `body`.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut cur = self.contains(node).then_some(node);
        while let Some(n) = cur {
            if n == self.body {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// `node` and all of its descendants in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.contains(node).then_some(node).into_iter().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev());
        }
        out
    }

    /// Connected elements whose attribute `name` equals `value`.
    pub fn query_attr(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|n| self.attr(*n, name) == Some(value))
            .collect()
    }

    /// Connected elements carrying `class`.
    pub fn query_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|n| self.element(*n).is_some_and(|e| e.has_class(class)))
            .collect()
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| match self.data(n)? {
                NodeData::Text(t) => Some(t.as_str()),
                NodeData::Element(_) => None,
            })
            .collect()
    }

    /// Widget value of an element.
    pub fn value(&self, node: NodeId) -> &str {
        self.element(node).map(|e| e.value.as_str()).unwrap_or("")
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(e) = self.element_mut(node) {
            e.value = value.to_string();
        }
    }

    pub fn checked(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|e| e.checked)
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if let Some(e) = self.element_mut(node) {
            e.checked = checked;
        }
    }

    /// Serialize `node` as HTML. Widget properties are written as attributes.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let e = match self.data(node) {
            None => return,
            Some(NodeData::Text(t)) => {
                out.push_str(&escape(t));
                return;
            }
            Some(NodeData::Element(e)) => e,
        };

        let _ = write!(out, "<{}", e.tag);
        for (k, v) in &e.attrs {
            let _ = write!(out, " {k}=\"{}\"", escape(v));
        }
        if e.tag == "input" || e.tag == "select" {
            let _ = write!(out, " value=\"{}\"", escape(&e.value));
        }
        if e.checked {
            out.push_str(" checked");
        }
        out.push('>');
        if VOID_TAGS.contains(&e.tag.as_str()) {
            return;
        }
        for child in self.children(node) {
            self.write_html(*child, out);
        }
        let _ = write!(out, "</{}>", e.tag);
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_moves_node() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let t = doc.create_text("x");
        doc.append_child(a, t);
        doc.append_child(b, t);
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), &[t]);
        assert_eq!(doc.parent(t), Some(b));
    }

    #[test]
    fn test_queries_only_see_connected_nodes() {
        let mut doc = Document::new();
        let live = doc.create_element("span");
        let detached = doc.create_element("span");
        doc.set_attr(live, "data-render-id", "rc-1");
        doc.set_attr(detached, "data-render-id", "rc-1");
        doc.append_child(doc.body(), live);

        assert_eq!(doc.query_attr("data-render-id", "rc-1"), vec![live]);
        assert!(doc.is_connected(live));
        assert!(!doc.is_connected(detached));

        doc.detach(live);
        assert!(doc.query_attr("data-render-id", "rc-1").is_empty());
    }

    #[test]
    fn test_html_serialization() {
        let mut doc = Document::new();
        let label = doc.create_element("label");
        let input = doc.create_element("input");
        doc.set_attr(input, "type", "checkbox");
        doc.set_checked(input, true);
        let text = doc.create_text("a < b & c");
        doc.append_child(label, input);
        doc.append_child(label, text);
        let br = doc.create_element("br");
        doc.prepend_child(label, br);

        assert_eq!(
            doc.to_html(label),
            "<label><br><input type=\"checkbox\" value=\"\" checked>a &lt; b &amp; c</label>"
        );
        assert_eq!(doc.text_content(label), "a < b & c");
    }

    #[test]
    fn test_class_query() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attr(div, "class", "rc-item rc-rule");
        doc.append_child(doc.body(), div);
        assert_eq!(doc.query_class("rc-rule"), vec![div]);
        assert!(doc.query_class("rc").is_empty());
    }

    #[test]
    fn test_remove_frees_subtree_and_reuses_slots() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        let text = doc.create_text("x");
        doc.append_child(span, text);
        doc.append_child(div, span);
        doc.append_child(doc.body(), div);
        assert_eq!(doc.len(), 4);

        assert_eq!(doc.remove(div), 3);
        assert_eq!(doc.len(), 1);
        assert!(doc.children(doc.body()).is_empty());
        assert!(!doc.contains(span));

        let reused = doc.create_element("p");
        assert_eq!(doc.len(), 2);
        assert_ne!(reused, div);
        assert_ne!(reused, span);
        assert_ne!(reused, text);
    }

    #[test]
    fn test_stale_handles_are_inert() {
        let mut doc = Document::new();
        let old = doc.create_element("input");
        doc.remove(old);
        let fresh = doc.create_element("input");

        doc.set_value(old, "7");
        doc.append_child(doc.body(), old);
        assert_eq!(doc.value(fresh), "");
        assert_eq!(doc.value(old), "");
        assert!(doc.children(doc.body()).is_empty());
        assert!(!doc.is_connected(old));
        assert_eq!(doc.remove(doc.body()), 0);
    }
}
