//! One-time execution of rules when the host is ready.
//!
//! Each rule contributes its static style, its conditional style when
//! enabled, and runs its hooks. A failing rule is logged and skipped; it
//! never stops the rules after it.

use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::anyhow;

use crate::{
    data::{item::ItemId, registry::Registry},
    error::{Error, Result},
};

impl Registry {
    /// Execute every rule under every tab once and inject their combined
    /// styles as a single sheet.
    ///
    /// Returns how many rules executed without error. Rules that already ran
    /// are skipped.
    pub fn ready(&self) -> usize {
        let mut css = String::new();
        let mut ok = 0;
        for rule in self.query_all() {
            if self.node(rule).is_some_and(|n| n.executed()) {
                continue;
            }
            match self.run_rule(rule, &mut css) {
                Ok(()) => ok += 1,
                Err(e) => error!("{e:#}"),
            }
        }
        self.push_styles(&css);
        info!("executed {ok} rule(s)");
        ok
    }

    /// Execute a single rule, appending its styles to the live sheet.
    ///
    /// A rule executes at most once; later calls are no-ops.
    pub fn execute(&self, rule: ItemId) -> Result<()> {
        let node = self
            .node(rule)
            .filter(|n| n.kind.is_rule())
            .ok_or_else(|| Error::UnknownItem(format!("{rule:?} is not a rule")))?;
        if node.executed() {
            debug!("{} already executed", self.items[rule.0].describe());
            return Ok(());
        }
        let mut css = String::new();
        let result = self.run_rule(rule, &mut css);
        self.push_styles(&css);
        result
    }

    fn push_styles(&self, css: &str) {
        if css.is_empty() {
            return;
        }
        let mut sheet = self.sheet.borrow_mut();
        match sheet.as_ref() {
            Some(handle) => handle.push_str(css),
            None => *sheet = Some(self.styles.append(css)),
        }
    }

    /// Run one rule, catching both errors and panics from its style and hooks.
    fn run_rule(&self, rule: ItemId, css: &mut String) -> Result<()> {
        let item = self.item(rule)?;
        if let Some(node) = &item.node {
            node.executed.set(true);
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| self.apply(rule, css)));
        let source = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                anyhow!("panicked: {msg}")
            }
        };
        Err(Error::RuleExecution {
            rule: item.describe(),
            source,
        })
    }

    fn apply(&self, rule: ItemId, css: &mut String) -> anyhow::Result<()> {
        let enabled = self.is_enabled(rule)?;
        let Some(node) = self.node(rule) else {
            return Ok(());
        };
        let effects = &node.effects;

        if let Some(text) = &effects.css {
            css.push_str(&text.resolve());
        }
        if enabled && let Some(text) = &effects.acss {
            css.push_str(&text.resolve());
        }
        if let Some(init) = &effects.init {
            init(self, rule)?;
        }
        if enabled && let Some(ainit) = &effects.ainit {
            ainit(self, rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use anyhow::bail;

    use super::*;
    use crate::{
        data::{
            text::Text,
            tree::{GroupDecl, RuleDecl, TabDecl},
        },
        store::MemoryStore,
        style::PageStyles,
    };

    fn setup() -> (Registry, Rc<PageStyles>, ItemId) {
        let _ = env_logger::builder().is_test(true).try_init();
        let styles = Rc::new(PageStyles::new());
        let mut reg = Registry::new(MemoryStore::new()).with_styles(styles.clone());
        let tab = reg.declare_tab(TabDecl::new("T")).unwrap();
        let group = reg.declare_group(tab, GroupDecl::new("G")).unwrap();
        (reg, styles, group)
    }

    #[test]
    fn test_end_to_end_enable_and_execute() {
        let (mut reg, styles, group) = setup();
        let rule = reg
            .declare_rule(
                group,
                RuleDecl::new("r", "Red")
                    .css(".x{color:red}")
                    .acss(".x{display:none}"),
            )
            .unwrap();

        assert!(!reg.is_enabled(rule).unwrap());
        assert_eq!(reg.get(rule).unwrap(), serde_json::json!(false));
        reg.set(rule, true).unwrap();
        assert!(reg.is_enabled(rule).unwrap());

        assert_eq!(reg.ready(), 1);
        assert_eq!(styles.css(), ".x{color:red}.x{display:none}");
        assert_eq!(styles.sheet_count(), 1);
    }

    #[test]
    fn test_disabled_rule_keeps_static_css_only() {
        let (mut reg, styles, group) = setup();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let (h1, h2) = (hits.clone(), hits.clone());
        reg.declare_rule(
            group,
            RuleDecl::new("off", "Off")
                .css("a{}")
                .acss("b{}")
                .init(move |_, _| {
                    h1.borrow_mut().push("init");
                    Ok(())
                })
                .ainit(move |_, _| {
                    h2.borrow_mut().push("ainit");
                    Ok(())
                }),
        )
        .unwrap();
        reg.ready();
        assert_eq!(styles.css(), "a{}");
        assert_eq!(*hits.borrow(), vec!["init"]);
    }

    #[test]
    fn test_failing_rule_does_not_stop_others() {
        let (mut reg, styles, group) = setup();
        let ran = Rc::new(RefCell::new(Vec::new()));
        let r = ran.clone();
        reg.declare_rule(
            group,
            RuleDecl::always("A").css("a{}").init(|_, _| bail!("boom")),
        )
        .unwrap();
        reg.declare_rule(
            group,
            RuleDecl::always("P").init(|_, _| panic!("kaboom")),
        )
        .unwrap();
        reg.declare_rule(
            group,
            RuleDecl::always("B")
                .css("b{}")
                .acss(Text::computed(|| "c{}".to_string()))
                .init({
                    let r = r.clone();
                    move |_, _| {
                        r.borrow_mut().push("init");
                        Ok(())
                    }
                })
                .ainit(move |_, _| {
                    r.borrow_mut().push("ainit");
                    Ok(())
                }),
        )
        .unwrap();

        assert_eq!(reg.ready(), 1);
        assert_eq!(styles.css(), "a{}b{}c{}");
        assert_eq!(*ran.borrow(), vec!["init", "ainit"]);
    }

    #[test]
    fn test_rules_execute_once() {
        let (mut reg, styles, group) = setup();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let rule = reg
            .declare_rule(
                group,
                RuleDecl::always("once").css("x{}").init(move |_, _| {
                    *c.borrow_mut() += 1;
                    Ok(())
                }),
            )
            .unwrap();
        reg.ready();
        reg.ready();
        reg.execute(rule).unwrap();
        assert_eq!(*count.borrow(), 1);
        assert_eq!(styles.css(), "x{}");
    }

    #[test]
    fn test_late_rule_extends_live_sheet() {
        let (mut reg, styles, group) = setup();
        reg.declare_rule(group, RuleDecl::always("early").css("e{}"))
            .unwrap();
        reg.ready();
        let late = reg
            .declare_rule(group, RuleDecl::always("late").css("l{}"))
            .unwrap();
        reg.execute(late).unwrap();
        assert_eq!(styles.sheet_count(), 1);
        assert_eq!(styles.css(), "e{}l{}");
    }

    #[test]
    fn test_execute_reports_failure() {
        let (mut reg, _, group) = setup();
        let rule = reg
            .declare_rule(group, RuleDecl::always("bad").init(|_, _| bail!("nope")))
            .unwrap();
        let err = reg.execute(rule).unwrap_err();
        assert!(matches!(err, Error::RuleExecution { .. }));
        assert!(reg.node(rule).unwrap().executed());
    }

    #[test]
    fn test_hooks_can_read_other_items() {
        let (mut reg, styles, group) = setup();
        let flag = reg.declare_rule(group, RuleDecl::new("flag", "Flag")).unwrap();
        reg.set(flag, true).unwrap();
        reg.declare_rule(
            group,
            RuleDecl::always("reader").init(move |reg, _| {
                if reg.is_enabled(flag)? {
                    reg.set(flag, false)?;
                }
                Ok(())
            }),
        )
        .unwrap();
        assert_eq!(reg.ready(), 2);
        assert!(!reg.is_enabled(flag).unwrap());
        assert!(styles.css().is_empty());
    }
}
