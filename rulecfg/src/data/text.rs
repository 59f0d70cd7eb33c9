use std::{fmt, rc::Rc};

/// A label or template: either literal text or a function producing it.
///
/// Computed text is resolved on every render so locale switches are picked up.
#[derive(Clone)]
pub enum Text {
    Literal(String),
    Computed(Rc<dyn Fn() -> String>),
}

impl Text {
    pub fn computed(f: impl Fn() -> String + 'static) -> Self {
        Text::Computed(Rc::new(f))
    }

    pub fn resolve(&self) -> String {
        match self {
            Text::Literal(s) => s.clone(),
            Text::Computed(f) => f(),
        }
    }
}

impl Default for Text {
    fn default() -> Self {
        Text::Literal(String::new())
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Text::Literal(s) => write!(f, "{s:?}"),
            Text::Computed(_) => f.write_str("<computed>"),
        }
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::Literal(s.to_string())
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text::Literal(s)
    }
}
