//! # rulecfg
//!
//! Declarative settings trees for page customization rules.
//!
//! Settings are organized as tabs holding groups holding rules. Each rule is
//! a toggle whose label is a small template that can embed nested config
//! items (checkboxes, selects, numbers, sliders and help bubbles). Values
//! live in a pluggable [`Store`] and are normalized on every read and write.
//!
//! ## Features
//!
//! - Typed config items with self-healing persisted values
//! - Label templates with `{{child}}`, `[[rule]]` and `|`/`||` splitters
//! - Every rendered copy of an item stays in sync with the store
//! - One-time rule execution with styles injected as a single sheet
//! - Trees declared in code or loaded from TOML/JSON files
//!
//! ## Quick Start
//!
//! ```rust
//! use rulecfg::{GroupDecl, ItemDecl, MemoryStore, Registry, RuleDecl, TabDecl};
//!
//! let mut reg = Registry::new(MemoryStore::new());
//! let tab = reg.declare_tab(TabDecl::new("Page").with_id("page")).unwrap();
//! let group = reg.declare_group(tab, GroupDecl::new("Layout")).unwrap();
//! let rule = reg
//!     .declare_rule(
//!         group,
//!         RuleDecl::new("wide", "Max width {{w}} px")
//!             .with_ref("w", ItemDecl::number("w", "").min(800.0))
//!             .acss("main { max-width: none }"),
//!     )
//!     .unwrap();
//!
//! reg.set(rule, true).unwrap();
//! assert_eq!(reg.ready(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Items, the rule tree and value binding
//! - [`ui`] - Templates, rendering and widgets
//! - [`run`] - Rule execution
//! - [`store`] - Value store contract
//! - [`style`] - Style sheet injection

#[macro_use]
extern crate log;

/// Items, the rule tree and value binding.
pub mod data;

pub mod error;

/// Render id allocation.
pub mod ident;

/// One-time rule execution.
pub mod run;

/// Persisted value store.
pub mod store;

/// Style sheet injection.
pub mod style;

/// Templates, rendering and widgets.
pub mod ui;

pub use data::{
    ConfigKind, GroupDecl, ItemDecl, ItemId, NodeKind, OptionDecl, Registry, RuleDecl, TabDecl,
    Text, TreeSpec,
};
pub use error::{Error, Result};
pub use serde_json::Value;
pub use store::{MemoryStore, Store, Subscription};
pub use style::{PageStyles, StyleInjector};
pub use ui::{Document, Event, EventKind, NodeId};
