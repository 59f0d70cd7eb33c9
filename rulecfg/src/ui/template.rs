//! Template tokenizer.
//!
//! Templates mix literal text with a few markers:
//!
//! - `{{name}}` renders the item's `refs[name]` in place
//! - `[[key]]` renders the rule registered under `key`
//! - `|` starts a new label, `||` also breaks the line
//! - `&amp;` is decoded to `&`; other entities pass through as written
//!
//! Anything else that does not form a token is dropped.

use std::sync::LazyLock;

use regex::Regex;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(.*?)\}\}|\[\[(.*?)\]\]|(\|\|?)|([^|\[{&]+)|(&[^;&\s]*;)")
        .expect("template token pattern is valid")
});

/// Kind of a template token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `{{name}}`, a nested item of the template's owner.
    Child,
    /// `[[key]]`, a rule or text node looked up by full key.
    Rule,
    /// `|` starts a new label, `||` also inserts a line break.
    Splitter,
    /// Literal text or an `&...;` entity.
    Text,
}

/// One token borrowed from the template it was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Child name, rule key, the splitter itself, or the raw text.
    pub value: &'a str,
}

/// Which token kinds a render pass accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Children, splitters and text.
    Normal,
    /// Normal plus rule references; used for the root of a full render.
    Recursive,
    /// Children and text only; used for plain-text summaries.
    Text,
}

impl Mode {
    pub fn allows(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Child | TokenKind::Text => true,
            TokenKind::Splitter => !matches!(self, Mode::Text),
            TokenKind::Rule => matches!(self, Mode::Recursive),
        }
    }
}

/// Split `template` into the tokens allowed by `mode`.
pub fn tokenize(template: &str, mode: Mode) -> Vec<Token<'_>> {
    TOKEN_RE
        .captures_iter(template)
        .filter_map(|caps| {
            let (kind, m) = if let Some(m) = caps.get(1) {
                (TokenKind::Child, m)
            } else if let Some(m) = caps.get(2) {
                (TokenKind::Rule, m)
            } else if let Some(m) = caps.get(3) {
                (TokenKind::Splitter, m)
            } else {
                (TokenKind::Text, caps.get(4).or_else(|| caps.get(5))?)
            };
            Some(Token {
                kind,
                value: m.as_str(),
            })
        })
        .filter(|t| mode.allows(t.kind))
        .collect()
}

/// Text content of a text token. Only `&amp;` is decoded.
pub fn decode_text(value: &str) -> &str {
    if value == "&amp;" { "&" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token<'_>]) -> Vec<(TokenKind, String)> {
        tokens
            .iter()
            .map(|t| (t.kind, t.value.to_string()))
            .collect()
    }

    #[test]
    fn test_recursive_mode_keeps_everything() {
        let tokens = tokenize("{{a}}||[[r]]text&amp;", Mode::Recursive);
        assert_eq!(
            kinds(&tokens),
            vec![
                (TokenKind::Child, "a".to_string()),
                (TokenKind::Splitter, "||".to_string()),
                (TokenKind::Rule, "r".to_string()),
                (TokenKind::Text, "text".to_string()),
                (TokenKind::Text, "&amp;".to_string()),
            ]
        );
    }

    #[test]
    fn test_text_mode_drops_splitters_and_rules() {
        let tokens = tokenize("{{a}}||[[r]]text&amp;", Mode::Text);
        assert_eq!(
            kinds(&tokens),
            vec![
                (TokenKind::Child, "a".to_string()),
                (TokenKind::Text, "text".to_string()),
                (TokenKind::Text, "&amp;".to_string()),
            ]
        );
    }

    #[test]
    fn test_normal_mode_drops_rule_refs() {
        let tokens = tokenize("a|[[r]]b", Mode::Normal);
        assert_eq!(
            kinds(&tokens),
            vec![
                (TokenKind::Text, "a".to_string()),
                (TokenKind::Splitter, "|".to_string()),
                (TokenKind::Text, "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_sequences_are_skipped() {
        let tokens = tokenize("{{open [x & y", Mode::Recursive);
        assert_eq!(
            kinds(&tokens),
            vec![
                (TokenKind::Text, "open ".to_string()),
                (TokenKind::Text, "x ".to_string()),
                (TokenKind::Text, " y".to_string()),
            ]
        );
    }

    #[test]
    fn test_splitter_variants() {
        let tokens = tokenize("a|||b", Mode::Normal);
        let splitters: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Splitter)
            .map(|t| t.value)
            .collect();
        assert_eq!(splitters, vec!["||", "|"]);
    }

    #[test]
    fn test_decode_only_amp() {
        assert_eq!(decode_text("&amp;"), "&");
        assert_eq!(decode_text("&lt;"), "&lt;");
        assert_eq!(decode_text("plain"), "plain");
    }
}
