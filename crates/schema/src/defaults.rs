//! Default synthesizer
//!
//! Every schema has exactly one default source: an explicit factory or the
//! field defaults. Whichever it is, [`create_default`] validates the output so
//! a freshly created component is always valid.

use serde_json::{Map, Value};

use crate::error::SchemaDefinitionError;
use crate::field::{FieldDescriptor, FieldKind};
use crate::hooks::{self, DefaultFn, Hook};
use crate::schema::SchemaDefinition;
use crate::validation::{self, FieldPath, ValidationFailure, TYPE_TAG};

/// Builds a valid default instance of `schema`.
///
/// A factory that produces an invalid instance is a contract violation and is
/// reported as a [`ValidationFailure`], never patched up.
pub fn create_default(schema: &SchemaDefinition) -> Result<Value, ValidationFailure> {
    let instance = schema.build_default();
    validation::validate(schema, &instance)?;
    tracing::trace!(type_name = schema.type_name(), "Synthesized default instance");
    Ok(instance)
}

/// Factory that assembles an instance from field defaults.
///
/// Fails at build time when a required field cannot be synthesized.
pub(crate) fn factory_from_fields(
    type_name: &str,
    fields: &[FieldDescriptor],
) -> Result<Hook<DefaultFn>, SchemaDefinitionError> {
    check_synthesizable(type_name, fields, &FieldPath::root())?;

    let type_name = type_name.to_string();
    let fields = fields.to_vec();
    Ok(hooks::default_hook(move || {
        let mut instance = Map::new();
        instance.insert(TYPE_TAG.to_string(), Value::String(type_name.clone()));
        synthesize_into(&mut instance, &fields);
        Value::Object(instance)
    }))
}

fn check_synthesizable(
    type_name: &str,
    fields: &[FieldDescriptor],
    parent: &FieldPath,
) -> Result<(), SchemaDefinitionError> {
    for field in fields {
        if !field.required || field.default.is_some() {
            continue;
        }
        let path = parent.field(&field.name);
        match &field.kind {
            FieldKind::Array { .. } | FieldKind::Map { .. } => {}
            FieldKind::Object { fields: nested } => check_synthesizable(type_name, nested, &path)?,
            _ => {
                return Err(SchemaDefinitionError::field(
                    type_name,
                    path.as_str(),
                    "required field has no default",
                ))
            }
        }
    }
    Ok(())
}

fn synthesize_into(target: &mut Map<String, Value>, fields: &[FieldDescriptor]) {
    for field in fields {
        if let Some(value) = synthesize_field(field) {
            target.insert(field.name.clone(), value);
        }
    }
}

fn synthesize_field(field: &FieldDescriptor) -> Option<Value> {
    if let Some(default) = &field.default {
        return Some(default.resolve());
    }
    if !field.required {
        return None;
    }
    match &field.kind {
        FieldKind::Array { .. } => Some(Value::Array(Vec::new())),
        FieldKind::Map { .. } => Some(Value::Object(Map::new())),
        FieldKind::Object { fields } => {
            let mut nested = Map::new();
            synthesize_into(&mut nested, fields);
            Some(Value::Object(nested))
        }
        // unreachable after check_synthesizable
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ComponentConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn scenario_default_from_fields() {
        let schema = ComponentConfig::new("x")
            .field(FieldDescriptor::unit("hunger").required().default_value(1.0))
            .field(FieldDescriptor::string("label").required().default_value("ok"))
            .default_from_fields()
            .build()
            .unwrap();
        assert_eq!(
            create_default(&schema).unwrap(),
            json!({"type": "x", "hunger": 1.0, "label": "ok"})
        );
    }

    #[test]
    fn collections_and_objects_are_synthesized_optional_fields_omitted() {
        let schema = ComponentConfig::new("position")
            .field(FieldDescriptor::array("path", FieldKind::string()).required())
            .field(FieldDescriptor::map("marks", FieldKind::Boolean).required())
            .field(
                FieldDescriptor::object(
                    "coords",
                    vec![
                        FieldDescriptor::number("x").required().default_value(0.0),
                        FieldDescriptor::number("z"),
                    ],
                )
                .required(),
            )
            .field(FieldDescriptor::string("note"))
            .default_from_fields()
            .build()
            .unwrap();
        assert_eq!(
            create_default(&schema).unwrap(),
            json!({"type": "position", "path": [], "marks": {}, "coords": {"x": 0.0}})
        );
    }

    #[test]
    fn required_scalar_without_default_fails_build() {
        let err = ComponentConfig::new("x")
            .field(FieldDescriptor::object(
                "inner",
                vec![FieldDescriptor::boolean("flag").required()],
            )
            .required())
            .default_from_fields()
            .build()
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("inner.flag"));
    }

    #[test]
    fn generators_run_per_instance() {
        let counter = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&counter);
        let schema = ComponentConfig::new("x")
            .field(
                FieldDescriptor::number("serial")
                    .required()
                    .default_with(move || json!(seen.fetch_add(1, Ordering::SeqCst))),
            )
            .default_from_fields()
            .build()
            .unwrap();
        assert_eq!(create_default(&schema).unwrap()["serial"], 0);
        assert_eq!(create_default(&schema).unwrap()["serial"], 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalid_factory_output_is_reported_not_fixed() {
        let schema = ComponentConfig::new("x")
            .field(FieldDescriptor::unit("hunger").required())
            .create_default(|| json!({"type": "x", "hunger": 1.2}))
            .build()
            .unwrap();
        let err = create_default(&schema).unwrap_err();
        assert!(err.is_range_error());
        assert_eq!(err.field(), Some("hunger"));
    }
}
