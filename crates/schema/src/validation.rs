//! Validation engine
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. the instance is an object whose `type` tag equals the schema's type name
//! 2. every field descriptor, in declaration order: presence, kind, then the
//!    kind's constraints (range, enum membership, lengths, nested shapes)
//! 3. the schema's cross-field invariants, in declaration order
//!
//! Out-of-range numbers are failures. Nothing is ever clamped or defaulted.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::field::{json_type_name, FieldDescriptor, FieldKind};
use crate::schema::SchemaDefinition;

/// Name of the discriminating tag every instance carries.
pub const TYPE_TAG: &str = "type";

// =============================================================================
// Failure types
// =============================================================================

/// Dotted path to the offending value, e.g. `items[2].quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn field(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{}", self.0, name))
        }
    }

    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    /// Any element of the array or map at this path.
    pub fn each(&self) -> Self {
        Self(format!("{}[*]", self.0))
    }

    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{:?}]", self.0, key))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the top-level field this path starts in.
    pub fn top_level_field(&self) -> Option<&str> {
        if self.0.is_empty() {
            return None;
        }
        let end = self.0.find(|c| c == '.' || c == '[').unwrap_or(self.0.len());
        Some(&self.0[..end])
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<instance>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Why a value was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    NotAnObject { found: &'static str },
    MissingTypeTag,
    WrongComponentType { found: String },
    MissingField,
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Range violation; bounds are inclusive
    OutOfRange { value: f64, min: f64, max: f64 },
    NotAnInteger { value: f64 },
    NotInEnum { value: String, allowed: Vec<String> },
    TooLong { length: usize, max: usize },
    TooManyItems { length: usize, max: usize },
    EmptyReference,
    /// A cross-field predicate returned false
    InvariantViolated { invariant: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { found } => write!(f, "expected an object, found {found}"),
            Self::MissingTypeTag => write!(f, "missing '{TYPE_TAG}' tag"),
            Self::WrongComponentType { found } => write!(f, "type tag is '{found}'"),
            Self::MissingField => write!(f, "required field is missing"),
            Self::KindMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::OutOfRange { value, min, max } => {
                write!(f, "{value} is outside [{min}, {max}]")
            }
            Self::NotAnInteger { value } => write!(f, "{value} is not an integer"),
            Self::NotInEnum { value, allowed } => {
                write!(f, "'{value}' is not one of [{}]", allowed.join(", "))
            }
            Self::TooLong { length, max } => write!(f, "length {length} exceeds {max}"),
            Self::TooManyItems { length, max } => write!(f, "{length} items exceed {max}"),
            Self::EmptyReference => write!(f, "reference must be a non-empty identifier"),
            Self::InvariantViolated { invariant } => {
                write!(f, "invariant '{invariant}' does not hold")
            }
        }
    }
}

/// An instance that does not conform to its schema.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid '{type_name}' at {path}: {reason}")]
pub struct ValidationFailure {
    pub type_name: String,
    pub path: FieldPath,
    pub reason: FailureReason,
}

impl ValidationFailure {
    /// True for the range-error class of failures.
    pub fn is_range_error(&self) -> bool {
        matches!(self.reason, FailureReason::OutOfRange { .. })
    }

    /// Top-level field the failure is attributed to, if any.
    pub fn field(&self) -> Option<&str> {
        self.path.top_level_field()
    }
}

/// Internal failure before the type name is attached.
#[derive(Debug)]
struct Violation {
    path: FieldPath,
    reason: FailureReason,
}

impl Violation {
    fn at(path: &FieldPath, reason: FailureReason) -> Self {
        Self {
            path: path.clone(),
            reason,
        }
    }

    fn into_failure(self, type_name: &str) -> ValidationFailure {
        ValidationFailure {
            type_name: type_name.to_string(),
            path: self.path,
            reason: self.reason,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Validates `value` as an instance of `schema`.
pub fn validate(schema: &SchemaDefinition, value: &Value) -> Result<(), ValidationFailure> {
    let fields = check_envelope(schema, value)?;
    check_fields(schema.fields(), fields, &FieldPath::root())
        .map_err(|violation| violation.into_failure(schema.type_name()))?;

    for invariant in schema.invariants() {
        if !(invariant.check)(value) {
            return Err(ValidationFailure {
                type_name: schema.type_name().to_string(),
                path: FieldPath::root(),
                reason: FailureReason::InvariantViolated {
                    invariant: invariant.name.clone(),
                },
            });
        }
    }
    Ok(())
}

/// Validates a candidate value for one top-level field.
///
/// Used by direct field writes before the whole instance is re-validated.
pub fn validate_field(
    schema: &SchemaDefinition,
    descriptor: &FieldDescriptor,
    value: &Value,
) -> Result<(), ValidationFailure> {
    check_field(descriptor, Some(value), &FieldPath::root())
        .map_err(|violation| violation.into_failure(schema.type_name()))
}

/// Step 1: object with the right `type` tag.
pub(crate) fn check_envelope<'v>(
    schema: &SchemaDefinition,
    value: &'v Value,
) -> Result<&'v Map<String, Value>, ValidationFailure> {
    let failure = |reason| ValidationFailure {
        type_name: schema.type_name().to_string(),
        path: FieldPath::root(),
        reason,
    };

    let fields = value.as_object().ok_or_else(|| {
        failure(FailureReason::NotAnObject {
            found: json_type_name(value),
        })
    })?;

    match fields.get(TYPE_TAG) {
        None => Err(failure(FailureReason::MissingTypeTag)),
        Some(Value::String(tag)) if tag == schema.type_name() => Ok(fields),
        Some(Value::String(tag)) => Err(failure(FailureReason::WrongComponentType {
            found: tag.clone(),
        })),
        Some(other) => Err(failure(FailureReason::WrongComponentType {
            found: other.to_string(),
        })),
    }
}

/// Checks a default value against its own descriptor, outside any instance.
pub(crate) fn check_default(
    type_name: &str,
    descriptor: &FieldDescriptor,
    value: &Value,
    parent: &FieldPath,
) -> Result<(), ValidationFailure> {
    check_kind(&descriptor.kind, value, &parent.field(&descriptor.name))
        .map_err(|violation| violation.into_failure(type_name))
}

fn check_fields(
    descriptors: &[FieldDescriptor],
    fields: &Map<String, Value>,
    parent: &FieldPath,
) -> Result<(), Violation> {
    for descriptor in descriptors {
        check_field(descriptor, fields.get(&descriptor.name), parent)?;
    }
    Ok(())
}

fn check_field(
    descriptor: &FieldDescriptor,
    value: Option<&Value>,
    parent: &FieldPath,
) -> Result<(), Violation> {
    let path = parent.field(&descriptor.name);
    match value {
        None | Some(Value::Null) => {
            if descriptor.required {
                Err(Violation::at(&path, FailureReason::MissingField))
            } else {
                Ok(())
            }
        }
        Some(value) => check_kind(&descriptor.kind, value, &path),
    }
}

fn mismatch(kind: &FieldKind, value: &Value, path: &FieldPath) -> Violation {
    Violation::at(
        path,
        FailureReason::KindMismatch {
            expected: kind.name(),
            found: json_type_name(value),
        },
    )
}

fn check_kind(kind: &FieldKind, value: &Value, path: &FieldPath) -> Result<(), Violation> {
    match kind {
        FieldKind::String { max_length } => {
            let text = value.as_str().ok_or_else(|| mismatch(kind, value, path))?;
            if let Some(max) = max_length {
                let length = text.chars().count();
                if length > *max {
                    return Err(Violation::at(
                        path,
                        FailureReason::TooLong { length, max: *max },
                    ));
                }
            }
            Ok(())
        }
        FieldKind::Number { range, integer } => {
            let number = value.as_f64().ok_or_else(|| mismatch(kind, value, path))?;
            if *integer && number.fract() != 0.0 {
                return Err(Violation::at(
                    path,
                    FailureReason::NotAnInteger { value: number },
                ));
            }
            if let Some(range) = range {
                if !range.contains(number) {
                    return Err(Violation::at(
                        path,
                        FailureReason::OutOfRange {
                            value: number,
                            min: range.min,
                            max: range.max,
                        },
                    ));
                }
            }
            Ok(())
        }
        FieldKind::Boolean => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err(mismatch(kind, value, path))
            }
        }
        FieldKind::Enum { values } => {
            let text = value.as_str().ok_or_else(|| mismatch(kind, value, path))?;
            if values.iter().any(|allowed| allowed == text) {
                Ok(())
            } else {
                Err(Violation::at(
                    path,
                    FailureReason::NotInEnum {
                        value: text.to_string(),
                        allowed: values.clone(),
                    },
                ))
            }
        }
        FieldKind::Array { items, max_items } => {
            let elements = value.as_array().ok_or_else(|| mismatch(kind, value, path))?;
            if let Some(max) = max_items {
                if elements.len() > *max {
                    return Err(Violation::at(
                        path,
                        FailureReason::TooManyItems {
                            length: elements.len(),
                            max: *max,
                        },
                    ));
                }
            }
            for (index, element) in elements.iter().enumerate() {
                check_kind(items, element, &path.index(index))?;
            }
            Ok(())
        }
        FieldKind::Map { values } => {
            let entries = value.as_object().ok_or_else(|| mismatch(kind, value, path))?;
            if let Some(values) = values {
                for (key, entry) in entries {
                    check_kind(values, entry, &path.key(key))?;
                }
            }
            Ok(())
        }
        FieldKind::Object { fields } => {
            let entries = value.as_object().ok_or_else(|| mismatch(kind, value, path))?;
            check_fields(fields, entries, path)
        }
        FieldKind::Reference { .. } => {
            let id = value.as_str().ok_or_else(|| mismatch(kind, value, path))?;
            if id.trim().is_empty() {
                Err(Violation::at(path, FailureReason::EmptyReference))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDescriptor;
    use crate::schema::ComponentConfig;
    use serde_json::json;

    fn scenario_schema() -> SchemaDefinition {
        ComponentConfig::new("x")
            .field(FieldDescriptor::unit("hunger").required().default_value(1.0))
            .field(FieldDescriptor::string("label").required().default_value("ok"))
            .default_from_fields()
            .build()
            .unwrap()
    }

    fn inventory_schema() -> SchemaDefinition {
        ComponentConfig::new("inventory")
            .field(
                FieldDescriptor::array(
                    "items",
                    FieldKind::object(vec![
                        FieldDescriptor::reference("item_id", None).required(),
                        FieldDescriptor::integer("quantity", 0.0, 999.0).required(),
                    ]),
                )
                .required()
                .max_items(3),
            )
            .field(FieldDescriptor::map("tags", FieldKind::enumeration(&["rare", "common"])))
            .field(FieldDescriptor::integer("capacity", 0.0, 100.0).required().default_value(10))
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

    #[test]
    fn accepts_valid_instance() {
        let schema = scenario_schema();
        assert!(validate(&schema, &json!({"type": "x", "hunger": 0.5, "label": "ok"})).is_ok());
    }

    #[test]
    fn range_is_inclusive_on_both_bounds() {
        let schema = scenario_schema();
        assert!(validate(&schema, &json!({"type": "x", "hunger": 0.0, "label": "a"})).is_ok());
        assert!(validate(&schema, &json!({"type": "x", "hunger": 1.0, "label": "a"})).is_ok());
    }

    #[test]
    fn out_of_range_is_a_range_failure_naming_the_field() {
        let schema = scenario_schema();
        for bad in [1.5, -0.1, 2.0] {
            let err = validate(&schema, &json!({"type": "x", "hunger": bad, "label": "ok"}))
                .unwrap_err();
            assert!(err.is_range_error());
            assert_eq!(err.field(), Some("hunger"));
            assert_eq!(err.type_name, "x");
        }
    }

    #[test]
    fn rejects_non_objects_and_wrong_tags() {
        let schema = scenario_schema();
        let err = validate(&schema, &json!([1])).unwrap_err();
        assert_eq!(err.reason, FailureReason::NotAnObject { found: "array" });

        let err = validate(&schema, &json!({"hunger": 0.1, "label": "a"})).unwrap_err();
        assert_eq!(err.reason, FailureReason::MissingTypeTag);

        let err = validate(&schema, &json!({"type": "y", "hunger": 0.1, "label": "a"})).unwrap_err();
        assert_eq!(
            err.reason,
            FailureReason::WrongComponentType {
                found: "y".to_string()
            }
        );
    }

    #[test]
    fn missing_required_field_and_null_are_equivalent() {
        let schema = scenario_schema();
        let missing = validate(&schema, &json!({"type": "x", "hunger": 0.1})).unwrap_err();
        assert_eq!(missing.field(), Some("label"));
        assert_eq!(missing.reason, FailureReason::MissingField);

        let null = validate(&schema, &json!({"type": "x", "hunger": 0.1, "label": null}))
            .unwrap_err();
        assert_eq!(null, missing);
    }

    #[test]
    fn fail_fast_reports_first_declared_field() {
        let schema = scenario_schema();
        let err = validate(&schema, &json!({"type": "x", "hunger": "full", "label": 3}))
            .unwrap_err();
        assert_eq!(err.field(), Some("hunger"));
        assert_eq!(
            err.reason,
            FailureReason::KindMismatch {
                expected: "number",
                found: "string"
            }
        );
    }

    #[test]
    fn nested_array_items_are_checked_with_paths() {
        let schema = inventory_schema();
        let value = json!({
            "type": "inventory",
            "capacity": 10,
            "items": [
                {"item_id": "bread", "quantity": 2},
                {"item_id": "apple", "quantity": 1.5}
            ]
        });
        let err = validate(&schema, &value).unwrap_err();
        assert_eq!(err.path.as_str(), "items[1].quantity");
        assert_eq!(err.field(), Some("items"));
        assert_eq!(err.reason, FailureReason::NotAnInteger { value: 1.5 });
    }

    #[test]
    fn empty_reference_is_rejected() {
        let schema = inventory_schema();
        let value = json!({
            "type": "inventory",
            "capacity": 10,
            "items": [{"item_id": " ", "quantity": 1}]
        });
        let err = validate(&schema, &value).unwrap_err();
        assert_eq!(err.reason, FailureReason::EmptyReference);
    }

    #[test]
    fn max_items_is_enforced() {
        let schema = inventory_schema();
        let item = json!({"item_id": "a", "quantity": 1});
        let value = json!({
            "type": "inventory",
            "capacity": 10,
            "items": [item.clone(), item.clone(), item.clone(), item]
        });
        let err = validate(&schema, &value).unwrap_err();
        assert_eq!(err.reason, FailureReason::TooManyItems { length: 4, max: 3 });
    }

    #[test]
    fn map_values_are_checked_by_key() {
        let schema = inventory_schema();
        let value = json!({
            "type": "inventory",
            "capacity": 10,
            "items": [],
            "tags": {"bread": "common", "gem": "legendary"}
        });
        let err = validate(&schema, &value).unwrap_err();
        assert_eq!(err.path.as_str(), "tags[\"gem\"]");
        assert!(matches!(err.reason, FailureReason::NotInEnum { .. }));
    }

    #[test]
    fn invariants_run_after_field_checks() {
        let schema = inventory_schema();
        let value = json!({
            "type": "inventory",
            "capacity": 2,
            "items": [{"item_id": "a", "quantity": 3}]
        });
        let err = validate(&schema, &value).unwrap_err();
        assert!(err.path.is_root());
        assert_eq!(
            err.reason,
            FailureReason::InvariantViolated {
                invariant: "within_capacity".to_string()
            }
        );
        assert!(err.to_string().contains("within_capacity"));
    }

    #[test]
    fn undescribed_keys_are_tolerated() {
        let schema = scenario_schema();
        let value = json!({"type": "x", "hunger": 0.2, "label": "a", "note": "extra"});
        assert!(validate(&schema, &value).is_ok());
    }

    #[test]
    fn failure_display_names_type_and_path() {
        let schema = scenario_schema();
        let err = validate(&schema, &json!({"type": "x", "hunger": 2.0, "label": "ok"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid 'x' at hunger: 2 is outside [0, 1]");
    }

    #[test]
    fn field_path_helpers() {
        let path = FieldPath::root().field("relationships").key("a-1").field("affinity");
        assert_eq!(path.as_str(), "relationships[\"a-1\"].affinity");
        assert_eq!(path.top_level_field(), Some("relationships"));
        assert_eq!(FieldPath::root().to_string(), "<instance>");
    }
}
