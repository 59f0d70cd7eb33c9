//! Process-unique render identifiers.
//!
//! A render id ties every DOM instance of an item back to the item, so a value
//! change can find and resync all of them at once.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RENDER_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier stamped on rendered nodes as `data-render-id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderId(String);

impl RenderId {
    /// Allocate a fresh id. Ids are never reused for the life of the process,
    /// even across independent registries.
    pub fn next() -> Self {
        let n = NEXT_RENDER_ID.fetch_add(1, Ordering::Relaxed);
        RenderId(format!("rc-{n}"))
    }

    /// The id as written into `data-render-id`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_render_ids_are_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| RenderId::next()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_render_id_format() {
        let id = RenderId::next();
        assert!(id.as_str().starts_with("rc-"));
        assert_eq!(id.to_string(), id.as_str());
    }
}
