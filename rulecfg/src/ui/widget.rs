//! Input widgets, event dispatch and display synchronization.
//!
//! Only trusted (user-originated) events write through to the store.
//! Untrusted events and store notifications write the stored value straight
//! into the widgets and never call back into `set`.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use serde_json::Value;

use crate::{
    data::{
        item::{ConfigKind, ItemId, NumberBounds, truthy},
        registry::Registry,
    },
    error::{Error, Result},
    ident::RenderId,
    store::StoreCallback,
    ui::dom::{Document, NodeId},
};

/// Attribute tying a node to the item it renders.
pub const RENDER_ID_ATTR: &str = "data-render-id";
/// Attribute naming the widget kind of an input node.
pub const WIDGET_ATTR: &str = "data-widget";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Checkbox,
    Select,
    Number,
    Slider,
}

impl WidgetKind {
    pub fn name(&self) -> &'static str {
        match self {
            WidgetKind::Checkbox => "checkbox",
            WidgetKind::Select => "select",
            WidgetKind::Number => "number",
            WidgetKind::Slider => "slider",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "checkbox" => WidgetKind::Checkbox,
            "select" => WidgetKind::Select,
            "number" => WidgetKind::Number,
            "slider" => WidgetKind::Slider,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Input,
    Change,
    Blur,
}

/// Event delivered to a widget by the host's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Whether the event came from a real user interaction.
    pub trusted: bool,
}

impl Event {
    pub fn user(kind: EventKind) -> Self {
        Self {
            kind,
            trusted: true,
        }
    }

    pub fn synthetic(kind: EventKind) -> Self {
        Self {
            kind,
            trusted: false,
        }
    }
}

fn widget(doc: &mut Document, render_id: &RenderId, tag: &str, kind: WidgetKind) -> NodeId {
    let node = doc.create_element(tag);
    doc.set_attr(node, "class", "rc-widget");
    doc.set_attr(node, RENDER_ID_ATTR, render_id.as_str());
    doc.set_attr(node, WIDGET_ATTR, kind.name());
    node
}

fn number_input(doc: &mut Document, render_id: &RenderId, bounds: &NumberBounds, kind: WidgetKind) -> NodeId {
    let (tag_type, widget_kind) = match kind {
        WidgetKind::Slider => ("range", WidgetKind::Slider),
        _ => ("number", WidgetKind::Number),
    };
    let node = widget(doc, render_id, "input", widget_kind);
    doc.set_attr(node, "type", tag_type);
    if bounds.min.is_finite() {
        doc.set_attr(node, "min", &bounds.min.to_string());
    }
    if bounds.max.is_finite() {
        doc.set_attr(node, "max", &bounds.max.to_string());
    }
    if let Some(step) = bounds.step.filter(|s| s.is_finite()) {
        doc.set_attr(node, "step", &step.to_string());
    }
    node
}

/// Create the widgets for `kind`, showing `value`.
pub(crate) fn build_widgets(
    doc: &mut Document,
    render_id: &RenderId,
    kind: &ConfigKind,
    value: &Value,
) -> Vec<NodeId> {
    let nodes = match kind {
        ConfigKind::Boolean => {
            let node = widget(doc, render_id, "input", WidgetKind::Checkbox);
            doc.set_attr(node, "type", "checkbox");
            vec![node]
        }
        ConfigKind::Select(options) => {
            let select = widget(doc, render_id, "select", WidgetKind::Select);
            for opt in options {
                let option = doc.create_element("option");
                doc.set_attr(option, "value", &opt.value);
                let label = doc.create_text(&opt.label.resolve());
                doc.append_child(option, label);
                doc.append_child(select, option);
            }
            vec![select]
        }
        ConfigKind::Number(bounds) => vec![number_input(doc, render_id, bounds, WidgetKind::Number)],
        ConfigKind::Range(bounds) if bounds.has_slider() => vec![
            number_input(doc, render_id, bounds, WidgetKind::Slider),
            number_input(doc, render_id, bounds, WidgetKind::Number),
        ],
        ConfigKind::Range(bounds) => vec![number_input(doc, render_id, bounds, WidgetKind::Number)],
        ConfigKind::Bubble => Vec::new(),
    };
    for node in &nodes {
        show_value(doc, *node, value);
    }
    nodes
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        v => v.to_string(),
    }
}

fn show_value(doc: &mut Document, node: NodeId, value: &Value) {
    match doc.attr(node, WIDGET_ATTR).and_then(WidgetKind::parse) {
        Some(WidgetKind::Checkbox) => doc.set_checked(node, truthy(value)),
        Some(_) => doc.set_value(node, &display(value)),
        None => {}
    }
}

/// Write `value` into every connected widget rendered for `render_id`.
///
/// Returns the number of widgets updated.
pub(crate) fn sync_instances(doc: &mut Document, render_id: &str, value: &Value) -> usize {
    let nodes: Vec<NodeId> = doc
        .query_attr(RENDER_ID_ATTR, render_id)
        .into_iter()
        .filter(|n| doc.attr(*n, WIDGET_ATTR).is_some())
        .collect();
    for node in &nodes {
        show_value(doc, *node, value);
    }
    nodes.len()
}

/// Store listener that keeps the rendered instances of one item in sync.
pub(crate) fn sync_listener(
    document: Weak<RefCell<Document>>,
    render_id: RenderId,
    kind: ConfigKind,
) -> StoreCallback {
    Rc::new(move |new, _old| {
        let Some(document) = document.upgrade() else {
            return;
        };
        let Ok(mut doc) = document.try_borrow_mut() else {
            // A render pass is writing the document and shows the fresh value itself.
            debug!("document busy, skipping resync of {render_id}");
            return;
        };
        sync_instances(&mut doc, render_id.as_str(), &kind.normalize(new));
    })
}

impl Registry {
    /// Deliver `event` to the widget `node`.
    ///
    /// Trusted commits write the widget's value through `set`; everything
    /// else redisplays the stored value. Events on nodes that are not
    /// widgets are ignored.
    pub fn dispatch(&self, node: NodeId, event: Event) -> Result<()> {
        let (item, widget, raw) = {
            let doc = self.document.borrow();
            let Some(render_id) = doc.attr(node, RENDER_ID_ATTR) else {
                return Ok(());
            };
            let Some(widget) = doc.attr(node, WIDGET_ATTR).and_then(WidgetKind::parse) else {
                return Ok(());
            };
            let item = self
                .find_by_render_id(render_id)
                .ok_or_else(|| Error::UnknownItem(render_id.to_string()))?;
            let raw = match widget {
                WidgetKind::Checkbox => Value::Bool(doc.checked(node)),
                _ => Value::String(doc.value(node).to_string()),
            };
            (item, widget, raw)
        };

        let commit = match (widget, event.kind) {
            (_, EventKind::Blur) => false,
            (WidgetKind::Checkbox | WidgetKind::Slider, _) => true,
            (WidgetKind::Select | WidgetKind::Number, EventKind::Change) => true,
            // Uncommitted typing; the value is picked up on change or dropped on blur.
            (WidgetKind::Select | WidgetKind::Number, EventKind::Input) => return Ok(()),
        };

        if commit && event.trusted {
            let value = self.set(item, raw)?;
            let render_id = self.items[item.0].render_id.clone();
            sync_instances(&mut self.document.borrow_mut(), render_id.as_str(), &value);
        } else {
            self.resync(item)?;
        }
        Ok(())
    }

    /// Redisplay the stored value in every live widget of `id`.
    pub fn resync(&self, id: ItemId) -> Result<usize> {
        let value = self.get(id)?;
        let render_id = self.items[id.0].render_id.clone();
        Ok(sync_instances(
            &mut self.document.borrow_mut(),
            render_id.as_str(),
            &value,
        ))
    }
}
