//! Error types for declaration, configuration access and rule execution.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the registry.
///
/// Construction-time errors ([`Error::Structural`], [`Error::InvalidOptions`])
/// abort the declaration they belong to. [`Error::RuleExecution`] is only
/// ever logged by the batch executor and never stops other rules.
#[derive(Debug, Error)]
pub enum Error {
    /// Illegal tree nesting, e.g. a group declared under something other than a tab.
    #[error("{node} must be declared under a {expected}, found {found}")]
    Structural {
        node: String,
        expected: &'static str,
        found: String,
    },

    /// A select item declared with no options or with non-string option values.
    #[error("invalid options for select `{item}`: {reason}")]
    InvalidOptions { item: String, reason: String },

    /// A config operation on an item that has no persisted value slot.
    #[error("item {render_id} has no id and cannot hold a config value")]
    MissingId { render_id: String },

    /// A rule's style or init logic failed.
    #[error("rule {rule} failed to execute: {source}")]
    RuleExecution {
        rule: String,
        #[source]
        source: anyhow::Error,
    },

    /// An item handle or render id that this registry does not know about.
    #[error("unknown item: {0}")]
    UnknownItem(String),
}
