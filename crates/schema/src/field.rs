//! Field descriptors
//!
//! A [`FieldDescriptor`] describes one named property of a component: its
//! [`FieldKind`] (which carries the kind's own constraints), whether it is
//! required, its default, whether direct writes are allowed, and how it appears
//! to each audience.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::audience::{Audience, Visibility, VisibilityMatrix};
use crate::context::SummaryContext;
use crate::error::SummaryError;
use crate::hooks::{self, FieldSummarizeFn, GenerateFn, Hook};

// =============================================================================
// Kinds
// =============================================================================

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    /// `[0, 1]`, the range of every normalized need, trait and score.
    pub const UNIT: NumericRange = NumericRange { min: 0.0, max: 1.0 };

    /// `[-1, 1]`, used for signed sentiment values.
    pub const SIGNED_UNIT: NumericRange = NumericRange {
        min: -1.0,
        max: 1.0,
    };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both bounds inclusive.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Primitive kind of a field together with its kind-specific constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldKind {
    String {
        #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        range: Option<NumericRange>,
        integer: bool,
    },
    Boolean,
    Enum {
        values: Vec<String>,
    },
    Array {
        items: Box<FieldKind>,
        #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
    /// String keys with homogeneous values; `None` accepts any JSON value
    Map {
        #[serde(skip_serializing_if = "Option::is_none")]
        values: Option<Box<FieldKind>>,
    },
    /// Nested record validated against its own descriptors
    Object {
        fields: Vec<FieldDescriptor>,
    },
    /// Identifier of another entity
    Reference {
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

impl FieldKind {
    pub fn string() -> Self {
        Self::String { max_length: None }
    }

    pub fn number() -> Self {
        Self::Number {
            range: None,
            integer: false,
        }
    }

    pub fn ranged(min: f64, max: f64) -> Self {
        Self::Number {
            range: Some(NumericRange::new(min, max)),
            integer: false,
        }
    }

    /// Number in `[0, 1]`.
    pub fn unit() -> Self {
        Self::Number {
            range: Some(NumericRange::UNIT),
            integer: false,
        }
    }

    pub fn integer(min: f64, max: f64) -> Self {
        Self::Number {
            range: Some(NumericRange::new(min, max)),
            integer: true,
        }
    }

    pub fn enumeration<S: AsRef<str>>(values: &[S]) -> Self {
        Self::Enum {
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
        }
    }

    pub fn array_of(items: FieldKind) -> Self {
        Self::Array {
            items: Box::new(items),
            max_items: None,
        }
    }

    pub fn map_of(values: FieldKind) -> Self {
        Self::Map {
            values: Some(Box::new(values)),
        }
    }

    pub fn object(fields: Vec<FieldDescriptor>) -> Self {
        Self::Object { fields }
    }

    pub fn reference() -> Self {
        Self::Reference { target: None }
    }

    /// Kind name as it appears in failure messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Number { .. } => "number",
            Self::Boolean => "boolean",
            Self::Enum { .. } => "enum",
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Object { .. } => "object",
            Self::Reference { .. } => "reference",
        }
    }

    /// True when nested field descriptors occur somewhere inside this kind.
    pub fn nests_fields(&self) -> bool {
        match self {
            Self::Object { .. } => true,
            Self::Array { items, .. } => items.nests_fields(),
            Self::Map {
                values: Some(values),
            } => values.nests_fields(),
            _ => false,
        }
    }

    pub fn range(&self) -> Option<NumericRange> {
        match self {
            Self::Number { range, .. } => *range,
            _ => None,
        }
    }
}

/// JSON type name of a raw value, for failure messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Defaults and hints
// =============================================================================

/// Default of a single field: a literal or a generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDefault {
    Value(Value),
    Generator(Hook<GenerateFn>),
}

impl FieldDefault {
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Generator(generate) => generate(),
        }
    }
}

/// UI metadata. Opaque to the core; carried through descriptions untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Field Descriptor
// =============================================================================

/// Definition of a single component field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldDefault>,
    /// Whether direct writes (outside named mutators) are permitted
    pub mutable: bool,
    pub visibility: VisibilityMatrix,
    pub display_hints: DisplayHints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarizer: Option<Hook<FieldSummarizeFn>>,
    /// Builder constraints that do not fit `kind`; rejected at build time.
    #[serde(skip)]
    pub(crate) misapplied: Vec<&'static str>,
}

impl FieldDescriptor {
    /// Optional, immutable, visible everywhere, no default.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
            mutable: false,
            visibility: VisibilityMatrix::default(),
            display_hints: DisplayHints::default(),
            description: None,
            summarizer: None,
            misapplied: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::string())
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::number())
    }

    pub fn ranged(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(name, FieldKind::ranged(min, max))
    }

    pub fn unit(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::unit())
    }

    pub fn integer(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(name, FieldKind::integer(min, max))
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn enumeration<S: AsRef<str>>(name: impl Into<String>, values: &[S]) -> Self {
        Self::new(name, FieldKind::enumeration(values))
    }

    pub fn array(name: impl Into<String>, items: FieldKind) -> Self {
        Self::new(name, FieldKind::array_of(items))
    }

    pub fn map(name: impl Into<String>, values: FieldKind) -> Self {
        Self::new(name, FieldKind::map_of(values))
    }

    pub fn object(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self::new(name, FieldKind::object(fields))
    }

    pub fn reference(name: impl Into<String>, target: Option<&str>) -> Self {
        Self::new(
            name,
            FieldKind::Reference {
                target: target.map(str::to_string),
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    pub fn default_with(mut self, generate: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(FieldDefault::Generator(hooks::generate_hook(generate)));
        self
    }

    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }

    /// Only meaningful on string fields; anything else fails the build.
    pub fn max_length(mut self, max: usize) -> Self {
        match &mut self.kind {
            FieldKind::String { max_length } => *max_length = Some(max),
            _ => self.misapplied.push("max_length"),
        }
        self
    }

    /// Only meaningful on array fields; anything else fails the build.
    pub fn max_items(mut self, max: usize) -> Self {
        match &mut self.kind {
            FieldKind::Array { max_items, .. } => *max_items = Some(max),
            _ => self.misapplied.push("max_items"),
        }
        self
    }

    pub fn visibility(mut self, visibility: VisibilityMatrix) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn hidden_from(mut self, audiences: &[Audience]) -> Self {
        for audience in audiences {
            self.visibility.set(*audience, Visibility::Hidden);
        }
        self
    }

    pub fn summarized_for(mut self, audiences: &[Audience]) -> Self {
        for audience in audiences {
            self.visibility.set(*audience, Visibility::Summarized);
        }
        self
    }

    pub fn visible_only_to(mut self, audiences: &[Audience]) -> Self {
        self.visibility = VisibilityMatrix::visible_only_to(audiences);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.display_hints.label = Some(label.into());
        self
    }

    pub fn widget(mut self, widget: impl Into<String>) -> Self {
        self.display_hints.widget = Some(widget.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.display_hints.group = Some(group.into());
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.display_hints.order = Some(order);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Summarizer used when this field's visibility is `summarized`.
    pub fn summarize_with(
        mut self,
        summarize: impl Fn(&Value, &SummaryContext<'_>) -> Result<String, SummaryError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.summarizer = Some(hooks::summarize_hook(summarize));
        self
    }
}
