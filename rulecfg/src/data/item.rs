use std::{cell::OnceCell, collections::BTreeMap};

use serde_json::{Number, Value};

use crate::{
    data::{binding::Binding, text::Text, tree::TreeNode},
    error::{Error, Result},
    ident::RenderId,
};

/// Offset added before flooring when snapping to a step, so values that are
/// already on the grid survive floating-point error unchanged.
const SNAP_EPSILON: f64 = 1e-9;

/// Handle to an item inside a [`Registry`](crate::data::registry::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) usize);

/// One choice of a select item.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: Text,
}

/// Bounds shared by number and range items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberBounds {
    pub min: f64,
    pub max: f64,
    /// Snapping step relative to `min`; `None` disables snapping.
    pub step: Option<f64>,
}

impl Default for NumberBounds {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: f64::INFINITY,
            step: None,
        }
    }
}

impl NumberBounds {
    /// Starting value: `min`, or zero pulled into range when `min` is unbounded.
    pub fn initial(&self) -> f64 {
        if self.min.is_finite() {
            self.min
        } else {
            0f64.max(self.min).min(self.max)
        }
    }

    /// Reason these bounds cannot be declared, if any.
    ///
    /// `min <= max`, neither is NaN, and a step must be finite and positive.
    pub fn check(&self) -> Option<String> {
        if self.min.is_nan() || self.max.is_nan() {
            return Some("bounds must not be NaN".to_string());
        }
        if self.min > self.max {
            return Some(format!("min {} is greater than max {}", self.min, self.max));
        }
        match self.step {
            Some(step) if !(step.is_finite() && step > 0.0) => {
                Some(format!("step {step} must be finite and greater than 0"))
            }
            _ => None,
        }
    }

    /// Whether a drag slider can be shown for these bounds.
    pub fn has_slider(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.step.is_some_and(f64::is_finite)
    }

    /// Clamp a finite value into `[min, max]` and snap it down onto the step grid.
    pub fn fit(&self, value: f64) -> f64 {
        let mut v = value.max(self.min).min(self.max);
        if let Some(step) = self.step.filter(|s| s.is_finite() && *s > 0.0)
            && self.min.is_finite()
        {
            let k = ((v - self.min) / step + SNAP_EPSILON).floor();
            v = self.min + k * step;
            if v > self.max {
                v -= step;
            }
        }
        v
    }
}

/// Value domain and widget of an item.
#[derive(Debug, Clone)]
pub enum ConfigKind {
    /// Checkbox holding `true`/`false`.
    Boolean,
    /// Single choice among string options.
    Select(Vec<SelectOption>),
    /// Numeric input.
    Number(NumberBounds),
    /// Numeric input with a drag slider when bounds allow it.
    Range(NumberBounds),
    /// Display-only popup, never persisted.
    Bubble,
}

impl ConfigKind {
    /// Lowercase name, also used as the item's CSS class suffix.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKind::Boolean => "boolean",
            ConfigKind::Select(_) => "select",
            ConfigKind::Number(_) => "number",
            ConfigKind::Range(_) => "range",
            ConfigKind::Bubble => "bubble",
        }
    }

    /// Whether items of this kind carry a persisted value.
    pub fn is_configurable(&self) -> bool {
        !matches!(self, ConfigKind::Bubble)
    }

    /// Bounds of number and range kinds.
    pub fn bounds(&self) -> Option<&NumberBounds> {
        match self {
            ConfigKind::Number(b) | ConfigKind::Range(b) => Some(b),
            _ => None,
        }
    }

    /// Value used when nothing valid is stored: `false`, the first option,
    /// the bounds' starting number, or `null` for bubbles.
    pub fn initial(&self) -> Value {
        match self {
            ConfigKind::Boolean => Value::Bool(false),
            ConfigKind::Select(options) => options
                .first()
                .map(|o| Value::String(o.value.clone()))
                .unwrap_or(Value::Null),
            ConfigKind::Number(b) | ConfigKind::Range(b) => number_value(b.initial()),
            ConfigKind::Bubble => Value::Null,
        }
    }

    /// Coerce a raw value into this kind's domain. Idempotent.
    pub fn normalize(&self, raw: &Value) -> Value {
        match self {
            ConfigKind::Boolean => match raw {
                Value::Null => self.initial(),
                v => Value::Bool(truthy(v)),
            },
            ConfigKind::Select(options) => match raw {
                Value::String(s) if options.iter().any(|o| o.value == *s) => raw.clone(),
                _ => self.initial(),
            },
            ConfigKind::Number(b) | ConfigKind::Range(b) => match coerce_number(raw) {
                Some(v) => number_value(b.fit(v)),
                None => self.initial(),
            },
            ConfigKind::Bubble => Value::Null,
        }
    }
}

/// JavaScript-style truthiness.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read a finite number out of a raw value.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|f| f.is_finite())
}

/// Encode a number, preferring integers so stored values stay canonical.
pub(crate) fn number_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        Value::from(v as i64)
    } else {
        Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Declared option of a select item, validated when the item is declared.
#[derive(Debug, Clone)]
pub struct OptionDecl {
    pub value: Value,
    pub label: Text,
}

impl OptionDecl {
    pub fn new(value: impl Into<Value>, label: impl Into<Text>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Declared kind of an item.
#[derive(Debug, Clone, Default)]
pub enum KindDecl {
    #[default]
    Boolean,
    Select(Vec<OptionDecl>),
    Number(NumberBounds),
    Range(NumberBounds),
    Bubble,
}

/// Declaration of a config item, consumed when the item is built.
#[derive(Debug, Clone, Default)]
pub struct ItemDecl {
    /// Local id; the persisted key is this id prefixed by the ancestors' ids.
    pub id: Option<String>,
    /// Template rendered around the item's widget.
    pub template: Text,
    pub kind: KindDecl,
    /// Nested items addressable from the template as `{{name}}`.
    pub refs: Vec<(String, ItemDecl)>,
}

impl ItemDecl {
    pub fn new(kind: KindDecl, template: impl Into<Text>) -> Self {
        Self {
            id: None,
            template: template.into(),
            kind,
            refs: Vec::new(),
        }
    }

    pub fn boolean(id: impl Into<String>, template: impl Into<Text>) -> Self {
        Self::new(KindDecl::Boolean, template).with_id(id)
    }

    pub fn select(id: impl Into<String>, template: impl Into<Text>, options: Vec<OptionDecl>) -> Self {
        Self::new(KindDecl::Select(options), template).with_id(id)
    }

    pub fn number(id: impl Into<String>, template: impl Into<Text>) -> Self {
        Self::new(KindDecl::Number(NumberBounds::default()), template).with_id(id)
    }

    pub fn range(id: impl Into<String>, template: impl Into<Text>) -> Self {
        Self::new(KindDecl::Range(NumberBounds::default()), template).with_id(id)
    }

    pub fn bubble(template: impl Into<Text>) -> Self {
        Self::new(KindDecl::Bubble, template)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ref(mut self, name: impl Into<String>, item: ItemDecl) -> Self {
        self.refs.push((name.into(), item));
        self
    }

    pub fn min(self, min: f64) -> Self {
        self.with_bounds(|b| b.min = min)
    }

    pub fn max(self, max: f64) -> Self {
        self.with_bounds(|b| b.max = max)
    }

    pub fn step(self, step: f64) -> Self {
        self.with_bounds(|b| b.step = Some(step))
    }

    fn with_bounds(mut self, f: impl FnOnce(&mut NumberBounds)) -> Self {
        if let KindDecl::Number(b) | KindDecl::Range(b) = &mut self.kind {
            f(b);
        }
        self
    }

    /// Name used in error messages.
    pub(crate) fn describe(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{:?}", self.template))
    }

    /// Turn the declared kind into a validated [`ConfigKind`].
    pub(crate) fn build_kind(&self) -> Result<ConfigKind> {
        Ok(match &self.kind {
            KindDecl::Boolean => ConfigKind::Boolean,
            KindDecl::Select(options) => {
                if options.is_empty() {
                    return Err(Error::InvalidOptions {
                        item: self.describe(),
                        reason: "at least one option is required".to_string(),
                    });
                }
                let mut built = Vec::with_capacity(options.len());
                for opt in options {
                    let Value::String(value) = &opt.value else {
                        return Err(Error::InvalidOptions {
                            item: self.describe(),
                            reason: format!("option value {} is not a string", opt.value),
                        });
                    };
                    built.push(SelectOption {
                        value: value.clone(),
                        label: opt.label.clone(),
                    });
                }
                ConfigKind::Select(built)
            }
            KindDecl::Number(b) | KindDecl::Range(b) => {
                if let Some(reason) = b.check() {
                    return Err(Error::InvalidOptions {
                        item: self.describe(),
                        reason,
                    });
                }
                match &self.kind {
                    KindDecl::Range(_) => ConfigKind::Range(*b),
                    _ => ConfigKind::Number(*b),
                }
            }
            KindDecl::Bubble => ConfigKind::Bubble,
        })
    }
}

/// An item stored in the registry arena.
#[derive(Debug)]
pub struct Item {
    pub(crate) id: Option<String>,
    pub(crate) key: Option<String>,
    /// Prefix handed down to children: `key`, or the parent's scope when this
    /// item has no id.
    pub(crate) scope: Option<String>,
    pub(crate) render_id: RenderId,
    pub(crate) kind: ConfigKind,
    pub(crate) template: Text,
    pub(crate) refs: BTreeMap<String, ItemId>,
    pub(crate) node: Option<TreeNode>,
    pub(crate) binding: OnceCell<Binding>,
}

impl Item {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Full dot-separated store key, if the item is config-backed.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn render_id(&self) -> &RenderId {
        &self.render_id
    }

    pub fn kind(&self) -> &ConfigKind {
        &self.kind
    }

    pub fn template(&self) -> &Text {
        &self.template
    }

    pub fn refs(&self) -> &BTreeMap<String, ItemId> {
        &self.refs
    }

    pub fn node(&self) -> Option<&TreeNode> {
        self.node.as_ref()
    }

    /// Identity used in log messages.
    pub fn describe(&self) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None => format!("{} ({:?})", self.render_id, self.template),
        }
    }
}
