//! Subcommand implementations. Each returns the text to print.

use std::collections::HashMap;
use std::io::Read as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use multiverse_components::{load_entity, EntityId};
use multiverse_schema::{
    llm_digest, project_with, render_digest, Audience, ComponentRegistry, ProjectionOptions,
    SummaryContext,
};
use serde::Serialize;
use serde_json::Value;

use crate::OutputFormat;

fn encode<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
    };
    Ok(text)
}

/// Reads JSON from `path`, or from stdin when no path (or `-`) is given.
pub fn read_json(path: Option<&Path>) -> Result<Value> {
    let text = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            text
        }
    };
    serde_json::from_str(&text).context("input is not valid JSON")
}

pub fn read_names(path: &Path) -> Result<HashMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).context("names file must be a JSON object of id -> name")
}

pub fn list(
    registry: &ComponentRegistry,
    category: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let schemas = match category {
        Some(category) => registry.by_category(category),
        None => registry.all().iter().cloned().collect(),
    };
    if format == OutputFormat::Json {
        let descriptions: Vec<_> = schemas.iter().map(|schema| schema.describe()).collect();
        return encode(&descriptions, format);
    }

    let mut out = String::new();
    for schema in &schemas {
        let mutators: Vec<&str> = schema.mutator_names().collect();
        out.push_str(&format!(
            "{:<16} {:<12} v{}  {} field(s)",
            schema.type_name(),
            schema.category(),
            schema.version(),
            schema.fields().len()
        ));
        if !mutators.is_empty() {
            out.push_str(&format!("  [{}]", mutators.join(", ")));
        }
        out.push('\n');
    }
    Ok(out.trim_end().to_string())
}

pub fn describe(registry: &ComponentRegistry, type_name: &str, format: OutputFormat) -> Result<String> {
    let schema = registry.get(type_name)?;
    encode(&schema.describe(), format)
}

pub fn default(registry: &ComponentRegistry, type_name: &str, format: OutputFormat) -> Result<String> {
    let instance = registry.create_default(type_name)?;
    encode(&instance, format)
}

pub fn check(registry: &ComponentRegistry, instance: &Value) -> Result<String> {
    let schema = registry.check(instance)?;
    Ok(format!("ok: valid '{}' instance", schema.type_name()))
}

pub fn project(
    registry: &ComponentRegistry,
    instance: &Value,
    audience: Audience,
    validate: bool,
    format: OutputFormat,
) -> Result<String> {
    let Some(type_name) = instance.get("type").and_then(Value::as_str) else {
        bail!("instance has no string 'type' tag");
    };
    let schema = registry.get(type_name)?;
    let options = ProjectionOptions {
        validate_first: validate,
    };
    let view = project_with(&schema, instance, audience, &SummaryContext::new(), options)?;
    encode(&view, format)
}

pub fn digest(
    registry: &ComponentRegistry,
    saved: Value,
    names: &HashMap<String, String>,
) -> Result<String> {
    let Value::Array(instances) = saved else {
        bail!("entity input must be a JSON array of component instances");
    };
    let report = load_entity(registry, EntityId::new(), instances);
    for rejected in &report.rejected {
        tracing::warn!(index = rejected.index, error = %rejected.error, "Skipping invalid component");
    }
    let ctx = SummaryContext::with_resolver(names);
    let sections = llm_digest(registry, &report.entity, &ctx)?;
    Ok(render_digest(&sections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ComponentRegistry {
        multiverse_components::registry().unwrap()
    }

    #[test]
    fn list_filters_by_category() {
        let out = list(&registry(), Some("mind"), OutputFormat::Pretty).unwrap();
        let types: Vec<&str> = out
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        assert_eq!(types, ["personality", "beliefs"]);
    }

    #[test]
    fn default_is_compact_json_when_asked() {
        let out = default(&registry(), "needs", OutputFormat::Json).unwrap();
        assert_eq!(
            out,
            r#"{"type":"needs","hunger":1.0,"thirst":1.0,"energy":1.0,"health":1.0}"#
        );
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = describe(&registry(), "dragon", OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("dragon"));
    }

    #[test]
    fn project_hides_fields_from_player() {
        let instance = json!({"type": "identity", "name": "Mara", "species": "elf", "true_name": "Ysolde"});
        let out = project(&registry(), &instance, Audience::Player, true, OutputFormat::Json).unwrap();
        assert!(out.contains("Mara"));
        assert!(!out.contains("Ysolde"));
    }

    #[test]
    fn digest_skips_invalid_components() {
        let saved = json!([
            {"type": "identity", "name": "Mara", "species": "elf"},
            {"type": "needs", "hunger": 5.0}
        ]);
        let out = digest(&registry(), saved, &HashMap::new()).unwrap();
        assert!(out.starts_with("## Identity"));
        assert!(!out.contains("## Status"));
    }
}
