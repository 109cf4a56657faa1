//! Mutator dispatcher
//!
//! Named mutators are the only sanctioned write path for managed fields. The
//! dispatcher works on a copy of the stored component and commits only after
//! the mutator succeeded and the result validates, so a rejected call leaves
//! the entity exactly as it was.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::error::{MutationError, MutatorError};
use crate::field::NumericRange;
use crate::schema::SchemaDefinition;
use crate::validation;

// =============================================================================
// Entity capability
// =============================================================================

/// Minimal capability the dispatcher needs from an entity: access to its
/// components by type name.
pub trait ComponentHost {
    fn component(&self, type_name: &str) -> Option<&Value>;

    fn component_mut(&mut self, type_name: &str) -> Option<&mut Value>;
}

impl ComponentHost for HashMap<String, Value> {
    fn component(&self, type_name: &str) -> Option<&Value> {
        self.get(type_name)
    }

    fn component_mut(&mut self, type_name: &str) -> Option<&mut Value> {
        self.get_mut(type_name)
    }
}

impl ComponentHost for BTreeMap<String, Value> {
    fn component(&self, type_name: &str) -> Option<&Value> {
        self.get(type_name)
    }

    fn component_mut(&mut self, type_name: &str) -> Option<&mut Value> {
        self.get_mut(type_name)
    }
}

// =============================================================================
// Mutator arguments
// =============================================================================

/// Positional arguments handed to a mutator, with checked accessors.
///
/// Accessors never coerce: a missing, mistyped or out-of-range argument is an
/// error, not a default.
#[derive(Debug, Clone, Copy)]
pub struct MutatorArgs<'a> {
    operation: &'a str,
    values: &'a [Value],
}

impl<'a> MutatorArgs<'a> {
    pub fn new(operation: &'a str, values: &'a [Value]) -> Self {
        Self { operation, values }
    }

    pub fn operation(&self) -> &'a str {
        self.operation
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw argument, `None` when absent or `null`.
    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index).filter(|value| !value.is_null())
    }

    pub fn value(&self, index: usize, name: &str) -> Result<&'a Value, MutatorError> {
        self.get(index).ok_or_else(|| MutatorError::MissingArgument {
            index,
            name: name.to_string(),
        })
    }

    pub fn number(&self, index: usize, name: &str) -> Result<f64, MutatorError> {
        let number = self
            .value(index, name)?
            .as_f64()
            .ok_or_else(|| MutatorError::invalid(name, "expected a number"))?;
        if number.is_finite() {
            Ok(number)
        } else {
            Err(MutatorError::invalid(name, "expected a finite number"))
        }
    }

    /// Number that must be `>= 0`.
    pub fn non_negative(&self, index: usize, name: &str) -> Result<f64, MutatorError> {
        let number = self.number(index, name)?;
        if number < 0.0 {
            return Err(MutatorError::invalid(name, format!("{number} is negative")));
        }
        Ok(number)
    }

    /// Non-negative whole number.
    pub fn count(&self, index: usize, name: &str) -> Result<u64, MutatorError> {
        let number = self.non_negative(index, name)?;
        if number.fract() != 0.0 {
            return Err(MutatorError::invalid(name, format!("{number} is not a whole number")));
        }
        Ok(number as u64)
    }

    /// Number within an inclusive range.
    pub fn in_range(
        &self,
        index: usize,
        name: &str,
        range: NumericRange,
    ) -> Result<f64, MutatorError> {
        let number = self.number(index, name)?;
        if range.contains(number) {
            Ok(number)
        } else {
            Err(MutatorError::OutOfRange {
                name: name.to_string(),
                value: number,
                min: range.min,
                max: range.max,
            })
        }
    }

    pub fn unit_interval(&self, index: usize, name: &str) -> Result<f64, MutatorError> {
        self.in_range(index, name, NumericRange::UNIT)
    }

    pub fn string(&self, index: usize, name: &str) -> Result<&'a str, MutatorError> {
        self.value(index, name)?
            .as_str()
            .ok_or_else(|| MutatorError::invalid(name, "expected a string"))
    }

    /// Non-blank identifier string.
    pub fn identifier(&self, index: usize, name: &str) -> Result<&'a str, MutatorError> {
        let id = self.string(index, name)?;
        if id.trim().is_empty() {
            return Err(MutatorError::invalid(name, "must not be empty"));
        }
        Ok(id)
    }

    pub fn optional_string(&self, index: usize, name: &str) -> Result<Option<&'a str>, MutatorError> {
        match self.get(index) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| MutatorError::invalid(name, "expected a string")),
        }
    }

    pub fn boolean(&self, index: usize, name: &str) -> Result<bool, MutatorError> {
        self.value(index, name)?
            .as_bool()
            .ok_or_else(|| MutatorError::invalid(name, "expected a boolean"))
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Runs the mutator `operation` of `schema` against `entity`'s component.
///
/// Order of checks: mutator exists, entity carries the component, the stored
/// component is valid, the mutator accepts its arguments, the result is valid.
/// Nothing is written unless every step passes.
pub fn invoke<H>(
    schema: &SchemaDefinition,
    entity: &mut H,
    operation: &str,
    args: &[Value],
) -> Result<(), MutationError>
where
    H: ComponentHost + ?Sized,
{
    let type_name = schema.type_name();
    let mutate = schema
        .mutator(operation)
        .ok_or_else(|| MutationError::UnknownMutator {
            type_name: type_name.to_string(),
            operation: operation.to_string(),
        })?;

    let stored = entity
        .component_mut(type_name)
        .ok_or_else(|| MutationError::MissingComponent {
            type_name: type_name.to_string(),
        })?;
    validation::validate(schema, stored).map_err(MutationError::InvalidComponentState)?;

    let mut working = stored.clone();
    if let Err(source) = mutate(&mut working, &MutatorArgs::new(operation, args)) {
        tracing::warn!(
            type_name = %type_name,
            operation = %operation,
            error = %source,
            "Mutator rejected its arguments"
        );
        return Err(MutationError::InvalidArgument {
            type_name: type_name.to_string(),
            operation: operation.to_string(),
            source,
        });
    }

    if let Err(failure) = validation::validate(schema, &working) {
        tracing::error!(
            type_name = %type_name,
            operation = %operation,
            error = %failure,
            "Mutator produced an invalid component"
        );
        return Err(MutationError::PostMutationInvariant {
            operation: operation.to_string(),
            failure,
        });
    }

    *stored = working;
    tracing::trace!(type_name = %type_name, operation = %operation, "Mutation committed");
    Ok(())
}

/// Writes one top-level field directly. Only fields declared `mutable` accept
/// direct writes; everything else goes through named mutators.
pub fn set_field<H>(
    schema: &SchemaDefinition,
    entity: &mut H,
    field: &str,
    value: Value,
) -> Result<(), MutationError>
where
    H: ComponentHost + ?Sized,
{
    let type_name = schema.type_name();
    let descriptor = schema.field(field).ok_or_else(|| MutationError::UnknownField {
        type_name: type_name.to_string(),
        field: field.to_string(),
    })?;
    if !descriptor.mutable {
        return Err(MutationError::ImmutableField {
            type_name: type_name.to_string(),
            field: field.to_string(),
        });
    }
    validation::validate_field(schema, descriptor, &value).map_err(MutationError::InvalidValue)?;

    let stored = entity
        .component_mut(type_name)
        .ok_or_else(|| MutationError::MissingComponent {
            type_name: type_name.to_string(),
        })?;

    let mut working = stored.clone();
    // a non-object component is reported by the envelope check below
    if let Some(fields) = working.as_object_mut() {
        fields.insert(field.to_string(), value);
    }
    validation::validate(schema, &working).map_err(MutationError::InvalidValue)?;

    *stored = working;
    tracing::trace!(type_name = %type_name, field = %field, "Field written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDescriptor, FieldKind};
    use crate::schema::ComponentConfig;
    use crate::validation::FailureReason;
    use serde_json::json;

    fn inventory() -> SchemaDefinition {
        ComponentConfig::new("inventory")
            .field(
                FieldDescriptor::array(
                    "items",
                    FieldKind::object(vec![
                        FieldDescriptor::string("id").required(),
                        FieldDescriptor::integer("quantity", 1.0, 999.0).required(),
                    ]),
                )
                .required(),
            )
            .field(
                FieldDescriptor::integer("capacity", 0.0, 50.0)
                    .required()
                    .default_value(5)
                    .mutable(),
            )
            .field(FieldDescriptor::string("owner").default_value("nobody"))
            .mutator("add_item", |value, args| {
                let id = args.identifier(0, "id")?;
                let quantity = args.count(1, "quantity")?;
                if quantity == 0 {
                    return Err(MutatorError::invalid("quantity", "must be positive"));
                }
                let items = value["items"]
                    .as_array_mut()
                    .ok_or_else(|| MutatorError::rejected("items is not an array"))?;
                items.push(json!({"id": id, "quantity": quantity}));
                Ok(())
            })
            .mutator("break_things", |value, _| {
                value["capacity"] = json!(-1);
                Ok(())
            })
            .invariant("within_capacity", |value| {
                let total: f64 = value["items"]
                    .as_array()
                    .map(|items| items.iter().filter_map(|i| i["quantity"].as_f64()).sum())
                    .unwrap_or(0.0);
                total <= value["capacity"].as_f64().unwrap_or(0.0)
            })
            .default_from_fields()
            .build()
            .unwrap()
    }

    fn entity_with(schema: &SchemaDefinition) -> HashMap<String, Value> {
        let mut entity = HashMap::new();
        entity.insert(
            schema.type_name().to_string(),
            crate::defaults::create_default(schema).unwrap(),
        );
        entity
    }

    #[test]
    fn applies_mutation() {
        let schema = inventory();
        let mut entity = entity_with(&schema);
        invoke(&schema, &mut entity, "add_item", &[json!("bread"), json!(2)]).unwrap();
        assert_eq!(entity["inventory"]["items"], json!([{"id": "bread", "quantity": 2}]));
    }

    #[test]
    fn negative_quantity_raises_before_any_change() {
        let schema = inventory();
        let mut entity = entity_with(&schema);
        let before = entity.clone();
        let err = invoke(&schema, &mut entity, "add_item", &[json!("bread"), json!(-3)]).unwrap_err();
        assert!(matches!(err, MutationError::InvalidArgument { ref operation, .. } if operation == "add_item"));
        assert_eq!(entity, before);
    }

    #[test]
    fn missing_argument_is_reported_by_position() {
        let schema = inventory();
        let mut entity = entity_with(&schema);
        let err = invoke(&schema, &mut entity, "add_item", &[json!("bread")]).unwrap_err();
        match err {
            MutationError::InvalidArgument { source, .. } => assert_eq!(
                source,
                MutatorError::MissingArgument {
                    index: 1,
                    name: "quantity".to_string()
                }
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invariant_break_is_not_committed() {
        let schema = inventory();
        let mut entity = entity_with(&schema);
        let before = entity.clone();
        let err = invoke(&schema, &mut entity, "add_item", &[json!("stone"), json!(9)]).unwrap_err();
        match err {
            MutationError::PostMutationInvariant { operation, failure } => {
                assert_eq!(operation, "add_item");
                assert_eq!(
                    failure.reason,
                    FailureReason::InvariantViolated {
                        invariant: "within_capacity".to_string()
                    }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(entity, before);
    }

    #[test]
    fn buggy_mutator_is_caught() {
        let schema = inventory();
        let mut entity = entity_with(&schema);
        let err = invoke(&schema, &mut entity, "break_things", &[]).unwrap_err();
        assert!(matches!(err, MutationError::PostMutationInvariant { .. }));
        assert_eq!(entity["inventory"]["capacity"], 5);
    }

    #[test]
    fn unknown_mutator_and_missing_component() {
        let schema = inventory();
        let mut entity = entity_with(&schema);
        let err = invoke(&schema, &mut entity, "teleport", &[]).unwrap_err();
        assert!(matches!(err, MutationError::UnknownMutator { .. }));

        let mut empty: HashMap<String, Value> = HashMap::new();
        let err = invoke(&schema, &mut empty, "add_item", &[json!("a"), json!(1)]).unwrap_err();
        assert_eq!(
            err,
            MutationError::MissingComponent {
                type_name: "inventory".to_string()
            }
        );
    }

    #[test]
    fn invalid_stored_state_is_refused() {
        let schema = inventory();
        let mut entity = entity_with(&schema);
        entity.insert("inventory".to_string(), json!({"type": "inventory", "capacity": 99, "items": []}));
        let err = invoke(&schema, &mut entity, "add_item", &[json!("a"), json!(1)]).unwrap_err();
        assert!(matches!(err, MutationError::InvalidComponentState(ref f) if f.is_range_error()));
    }

    #[test]
    fn set_field_respects_mutability_and_constraints() {
        let schema = inventory();
        let mut entity = entity_with(&schema);

        set_field(&schema, &mut entity, "capacity", json!(20)).unwrap();
        assert_eq!(entity["inventory"]["capacity"], 20);

        let err = set_field(&schema, &mut entity, "capacity", json!(80)).unwrap_err();
        assert!(matches!(err, MutationError::InvalidValue(ref f) if f.is_range_error()));

        let err = set_field(&schema, &mut entity, "owner", json!("mara")).unwrap_err();
        assert!(matches!(err, MutationError::ImmutableField { .. }));

        let err = set_field(&schema, &mut entity, "colour", json!("red")).unwrap_err();
        assert!(matches!(err, MutationError::UnknownField { .. }));
        assert_eq!(entity["inventory"]["capacity"], 20);
    }

    #[test]
    fn set_field_checks_whole_instance_invariants() {
        let schema = inventory();
        let mut entity = entity_with(&schema);
        invoke(&schema, &mut entity, "add_item", &[json!("a"), json!(4)]).unwrap();
        let err = set_field(&schema, &mut entity, "capacity", json!(2)).unwrap_err();
        assert!(matches!(
            err,
            MutationError::InvalidValue(ref f) if matches!(f.reason, FailureReason::InvariantViolated { .. })
        ));
        assert_eq!(entity["inventory"]["capacity"], 5);
    }

    #[test]
    fn args_accessors() {
        let values = [json!(0.5), json!("x"), json!(null), json!(1.5)];
        let args = MutatorArgs::new("op", &values);
        assert_eq!(args.operation(), "op");
        assert_eq!(args.unit_interval(0, "a").unwrap(), 0.5);
        assert_eq!(args.identifier(1, "b").unwrap(), "x");
        assert_eq!(args.optional_string(2, "c").unwrap(), None);
        assert!(matches!(
            args.unit_interval(3, "d"),
            Err(MutatorError::OutOfRange { value, .. }) if value == 1.5
        ));
        assert!(matches!(args.number(1, "b"), Err(MutatorError::InvalidArgument { .. })));
        assert!(matches!(args.count(3, "d"), Err(MutatorError::InvalidArgument { .. })));
    }
}
