//! LLM prompt digest of an entity
//!
//! Collects the `llm` projection of every registered component an entity
//! carries, ordered by the schema's llm priority and grouped by prompt section.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

use crate::audience::Audience;
use crate::context::SummaryContext;
use crate::error::ProjectionError;
use crate::mutation::ComponentHost;
use crate::projection::{project, ProjectedView};
use crate::registry::ComponentRegistry;
use crate::schema::SchemaDefinition;

/// One heading of the prompt with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptSection {
    pub name: String,
    pub lines: Vec<String>,
}

/// Builds the prompt sections for `entity`.
///
/// Components without a summarizer contribute their visible llm fields as a
/// single `key: value` line. Summarizer failures propagate.
pub fn llm_digest<H>(
    registry: &ComponentRegistry,
    entity: &H,
    ctx: &SummaryContext<'_>,
) -> Result<Vec<PromptSection>, ProjectionError>
where
    H: ComponentHost + ?Sized,
{
    let schemas = registry.all();
    let mut entries = Vec::new();
    for schema in &schemas {
        let Some(instance) = entity.component(schema.type_name()) else {
            continue;
        };
        let view = project(schema, instance, Audience::Llm, ctx)?;
        let line = match view.summary {
            Some(summary) => summary,
            None => field_line(schema, &view),
        };
        if !line.is_empty() {
            entries.push((schema.llm().priority, schema.prompt_section(), line));
        }
    }
    // stable: equal priorities keep registration order
    entries.sort_by_key(|(priority, _, _)| *priority);

    let mut sections: Vec<PromptSection> = Vec::new();
    for (_, section, line) in entries {
        match sections.iter_mut().find(|existing| existing.name == section) {
            Some(existing) => existing.lines.push(line),
            None => sections.push(PromptSection {
                name: section.to_string(),
                lines: vec![line],
            }),
        }
    }
    Ok(sections)
}

/// Markdown rendering of a digest.
pub fn render_digest(sections: &[PromptSection]) -> String {
    let mut out = String::new();
    for section in sections {
        let _ = writeln!(out, "## {}", section.name);
        for line in &section.lines {
            let _ = writeln!(out, "- {line}");
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn field_line(schema: &SchemaDefinition, view: &ProjectedView) -> String {
    if view.fields.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = view
        .fields
        .iter()
        .map(|(key, value)| match value {
            Value::String(text) => format!("{key}: {text}"),
            other => format!("{key}: {other}"),
        })
        .collect();
    format!("{}: {}", schema.display_name(), parts.join(", "))
}
