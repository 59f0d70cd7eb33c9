use crate::ui::dom::{Document, NodeId};

/// Popup widget used by bubble items.
pub trait Tooltip {
    /// Show `content` when `anchor` is hovered or focused.
    fn attach(&self, doc: &mut Document, content: NodeId, anchor: NodeId);
}

/// Nests the popup under its anchor as a hidden `role="tooltip"` element,
/// leaving show/hide to page styles.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineTooltip;

impl Tooltip for InlineTooltip {
    fn attach(&self, doc: &mut Document, content: NodeId, anchor: NodeId) {
        doc.set_attr(content, "role", "tooltip");
        doc.set_attr(content, "hidden", "");
        doc.append_child(anchor, content);
    }
}
