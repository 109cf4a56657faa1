//! Visibility projector
//!
//! Produces the audience-scoped view of a component instance. Hidden fields are
//! omitted outright, so a hidden field and a field that never existed look the
//! same to the consumer. Projection does not re-validate unless asked to via
//! [`ProjectionOptions::validate_first`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::audience::{Audience, Visibility};
use crate::context::SummaryContext;
use crate::error::{ProjectionError, SummaryError};
use crate::field::{json_type_name, FieldDescriptor, FieldKind, NumericRange};
use crate::schema::SchemaDefinition;
use crate::validation;

const MAX_SUMMARY_CHARS: usize = 40;

/// Projection behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectionOptions {
    /// Run full validation before projecting
    pub validate_first: bool,
}

impl ProjectionOptions {
    pub fn validated() -> Self {
        Self {
            validate_first: true,
        }
    }
}

/// The view of one component instance for one audience.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedView {
    pub type_name: String,
    pub audience: Audience,
    /// Visible and summarized fields, in declaration order
    pub fields: Map<String, Value>,
    /// Whole-instance summary (llm audience only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Output of the audience's renderer, when the schema has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
}

impl ProjectedView {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

/// Projects `instance` for `audience` with default options.
pub fn project(
    schema: &SchemaDefinition,
    instance: &Value,
    audience: Audience,
    ctx: &SummaryContext<'_>,
) -> Result<ProjectedView, ProjectionError> {
    project_with(schema, instance, audience, ctx, ProjectionOptions::default())
}

pub fn project_with(
    schema: &SchemaDefinition,
    instance: &Value,
    audience: Audience,
    ctx: &SummaryContext<'_>,
    options: ProjectionOptions,
) -> Result<ProjectedView, ProjectionError> {
    if options.validate_first {
        validation::validate(schema, instance)?;
    }
    let source = validation::check_envelope(schema, instance)?;

    let summary_failed = |source: SummaryError| ProjectionError::Summary {
        type_name: schema.type_name().to_string(),
        audience,
        source,
    };

    let fields =
        project_fields(schema.fields(), source, audience, ctx).map_err(summary_failed)?;

    let summary = match (audience, schema.summarizer()) {
        (Audience::Llm, Some(summarize)) => Some(summarize(instance, ctx).map_err(summary_failed)?),
        _ => None,
    };

    let rendered = schema
        .renderer(audience)
        .map(|render| render(instance, ctx))
        .transpose()
        .map_err(summary_failed)?;

    Ok(ProjectedView {
        type_name: schema.type_name().to_string(),
        audience,
        fields,
        summary,
        rendered,
    })
}

fn project_fields(
    descriptors: &[FieldDescriptor],
    source: &Map<String, Value>,
    audience: Audience,
    ctx: &SummaryContext<'_>,
) -> Result<Map<String, Value>, SummaryError> {
    let mut view = Map::new();
    for descriptor in descriptors {
        let Some(value) = source.get(&descriptor.name).filter(|v| !v.is_null()) else {
            continue;
        };
        let projected = match descriptor.visibility.get(audience) {
            Visibility::Hidden => continue,
            Visibility::Visible => project_value(&descriptor.kind, value, audience, ctx)?,
            Visibility::Summarized => Value::String(summarize_field(descriptor, value, ctx)?),
        };
        view.insert(descriptor.name.clone(), projected);
    }
    Ok(view)
}

/// Raw value, with nested visibility applied inside objects wherever they
/// occur: directly, as array items or as map values, at any depth.
fn project_value(
    kind: &FieldKind,
    value: &Value,
    audience: Audience,
    ctx: &SummaryContext<'_>,
) -> Result<Value, SummaryError> {
    if !kind.nests_fields() {
        return Ok(value.clone());
    }
    match (kind, value) {
        (FieldKind::Object { fields }, Value::Object(nested)) => {
            Ok(Value::Object(project_fields(fields, nested, audience, ctx)?))
        }
        (FieldKind::Array { items, .. }, Value::Array(elements)) => elements
            .iter()
            .map(|element| project_value(items, element, audience, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (
            FieldKind::Map {
                values: Some(values),
            },
            Value::Object(entries),
        ) => {
            let mut projected = Map::with_capacity(entries.len());
            for (key, entry) in entries {
                projected.insert(key.clone(), project_value(values, entry, audience, ctx)?);
            }
            Ok(Value::Object(projected))
        }
        _ => Ok(value.clone()),
    }
}

fn summarize_field(
    descriptor: &FieldDescriptor,
    value: &Value,
    ctx: &SummaryContext<'_>,
) -> Result<String, SummaryError> {
    match &descriptor.summarizer {
        Some(summarize) => summarize(value, ctx),
        None => builtin_summary(&descriptor.name, &descriptor.kind, value, ctx),
    }
}

fn builtin_summary(
    field: &str,
    kind: &FieldKind,
    value: &Value,
    ctx: &SummaryContext<'_>,
) -> Result<String, SummaryError> {
    let malformed = || {
        SummaryError::malformed(
            field,
            format!("expected {}, found {}", kind.name(), json_type_name(value)),
        )
    };
    match kind {
        FieldKind::Number { range, .. } => {
            let number = value.as_f64().ok_or_else(malformed)?;
            if *range == Some(NumericRange::UNIT) {
                Ok(format!("{:.0}%", number * 100.0))
            } else {
                Ok(number.to_string())
            }
        }
        FieldKind::Boolean => {
            let flag = value.as_bool().ok_or_else(malformed)?;
            Ok(if flag { "yes" } else { "no" }.to_string())
        }
        FieldKind::String { .. } | FieldKind::Enum { .. } => {
            let text = value.as_str().ok_or_else(malformed)?;
            Ok(truncate(text))
        }
        FieldKind::Array { .. } => {
            let elements = value.as_array().ok_or_else(malformed)?;
            Ok(count_label(elements.len(), "item", "items"))
        }
        FieldKind::Map { .. } => {
            let entries = value.as_object().ok_or_else(malformed)?;
            Ok(count_label(entries.len(), "entry", "entries"))
        }
        FieldKind::Object { .. } => {
            let entries = value.as_object().ok_or_else(malformed)?;
            Ok(count_label(entries.len(), "field", "fields"))
        }
        FieldKind::Reference { .. } => {
            let id = value.as_str().ok_or_else(malformed)?;
            Ok(ctx.name_of(id))
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_SUMMARY_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(MAX_SUMMARY_CHARS).collect();
    short.push_str("...");
    short
}

fn count_label(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {singular}")
    } else {
        format!("{count} {plural}")
    }
}
