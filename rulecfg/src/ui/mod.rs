//! Rendering of items into a document, and widget synchronization.

/// Minimal arena document model.
pub mod dom;

/// Item and panel rendering.
pub mod render;

/// Label template tokenizer.
pub mod template;

pub mod tooltip;

/// Input widgets bound to item values.
pub mod widget;

pub use dom::{Document, NodeId};
pub use tooltip::{InlineTooltip, Tooltip};
pub use widget::{Event, EventKind};
