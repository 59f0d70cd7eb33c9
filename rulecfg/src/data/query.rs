use std::collections::HashSet;

use crate::data::{item::ItemId, registry::Registry};

impl Registry {
    /// Every rule under every tab, in declaration order.
    pub fn query_all(&self) -> Vec<ItemId> {
        self.query(self.tabs())
    }

    /// Depth-first flattening of `base` into the rules it contains.
    ///
    /// Tabs and groups are walked; rule and text nodes are collected. A rule
    /// reachable more than once is reported once, at its first position.
    pub fn query(&self, base: &[ItemId]) -> Vec<ItemId> {
        self.query_where(base, |_, _| true)
    }

    /// Like [`Registry::query`], keeping only rules accepted by `filter`.
    pub fn query_where(&self, base: &[ItemId], filter: impl Fn(&Registry, ItemId) -> bool) -> Vec<ItemId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in base {
            self.visit(*id, &filter, &mut seen, &mut out);
        }
        out
    }

    fn visit(
        &self,
        id: ItemId,
        filter: &impl Fn(&Registry, ItemId) -> bool,
        seen: &mut HashSet<ItemId>,
        out: &mut Vec<ItemId>,
    ) {
        if !seen.insert(id) {
            return;
        }
        let Some(node) = self.node(id) else {
            warn!("query: {id:?} is not part of the rule tree");
            return;
        };
        if node.kind.is_container() {
            for child in &node.children {
                self.visit(*child, filter, seen, out);
            }
        }
        if node.kind.is_rule() && filter(self, id) {
            out.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        data::tree::{GroupDecl, RuleDecl, TabDecl},
        store::MemoryStore,
    };

    use super::*;

    #[test]
    fn test_query_is_depth_first_and_deduplicated() {
        let mut reg = Registry::new(MemoryStore::new());
        let tab_a = reg.declare_tab(TabDecl::new("A")).unwrap();
        let tab_b = reg.declare_tab(TabDecl::new("B")).unwrap();
        let ga1 = reg.declare_group(tab_a, GroupDecl::new("a1")).unwrap();
        let gb1 = reg.declare_group(tab_b, GroupDecl::new("b1")).unwrap();
        let ga2 = reg.declare_group(tab_a, GroupDecl::new("a2")).unwrap();
        let r1 = reg.declare_rule(ga1, RuleDecl::new("r1", "")).unwrap();
        let r2 = reg.declare_rule(gb1, RuleDecl::new("r2", "")).unwrap();
        let r3 = reg.declare_rule(ga2, RuleDecl::new("r3", "")).unwrap();
        let r4 = reg.declare_text(ga1, RuleDecl::always("note")).unwrap();

        assert_eq!(reg.query(&[tab_a, tab_b]), vec![r1, r4, r3, r2]);
        assert_eq!(reg.query_all(), vec![r1, r4, r3, r2]);
        assert_eq!(reg.query(&[ga2, tab_a, r3, ga2]), vec![r3, r1, r4]);
        assert_eq!(reg.query(&[tab_b, r1]), vec![r2, r1]);
    }

    #[test]
    fn test_query_where_filters_rules_only() {
        let mut reg = Registry::new(MemoryStore::new());
        let tab = reg.declare_tab(TabDecl::new("T")).unwrap();
        let group = reg.declare_group(tab, GroupDecl::new("G")).unwrap();
        let keep = reg.declare_rule(group, RuleDecl::new("keep", "")).unwrap();
        reg.declare_text(group, RuleDecl::always("drop")).unwrap();

        let rules = reg.query_where(&[tab], |reg, id| !reg.node(id).unwrap().always());
        assert_eq!(rules, vec![keep]);
    }

    #[test]
    fn test_query_ignores_plain_items() {
        let mut reg = Registry::new(MemoryStore::new());
        let loose = reg
            .declare_item(crate::data::item::ItemDecl::boolean("x", ""))
            .unwrap();
        assert!(reg.query(&[loose]).is_empty());
    }
}
