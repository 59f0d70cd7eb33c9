//! Config items and the rule tree.
//!
//! ## Architecture
//!
//! - [`registry`] - Arena owning every declared item, indexed by key
//! - [`item`] - Config items, their kinds and value normalization
//! - [`tree`] - Tab, group, rule and text nodes
//! - [`binding`] - Lazy binding of items to persisted values
//! - [`query`] - Depth-first flattening of the tree into rules
//! - [`spec`] - Rule trees loaded from TOML or JSON
//! - [`text`] - Literal or computed display text

/// Lazy binding of items to the value store.
pub mod binding;

/// Individual config item representation.
pub mod item;

/// Rule tree traversal.
pub mod query;

/// Item arena and declaration.
pub mod registry;

/// Data-driven tree declarations.
pub mod spec;

pub mod text;

/// Tab, group and rule nodes.
pub mod tree;

pub use item::{ConfigKind, Item, ItemDecl, ItemId, OptionDecl};
pub use registry::Registry;
pub use spec::TreeSpec;
pub use text::Text;
pub use tree::{GroupDecl, NodeKind, RuleDecl, TabDecl};
