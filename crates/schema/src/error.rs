//! Error types for the schema layer
//!
//! Registration-time errors ([`SchemaDefinitionError`], [`RegistryError`]) mean
//! a component contract is broken and must not be used. Instance-level errors
//! ([`ValidationFailure`](crate::ValidationFailure), [`MutationError`],
//! [`ProjectionError`]) are returned to the caller, who decides whether to
//! discard, repair or surface the data. The core never repairs anything itself.

use thiserror::Error;

use crate::audience::Audience;
use crate::validation::ValidationFailure;

fn field_label(field: &Option<String>) -> String {
    match field {
        Some(field) => format!(" (field '{field}')"),
        None => String::new(),
    }
}

/// A schema that cannot enter the registry.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("malformed schema '{type_name}'{}: {reason}", field_label(.field))]
pub struct SchemaDefinitionError {
    pub type_name: String,
    pub field: Option<String>,
    pub reason: String,
}

impl SchemaDefinitionError {
    /// Schema-level problem (bad type name, missing factory, ...).
    pub fn schema(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field: None,
            reason: reason.into(),
        }
    }

    /// Problem attributable to one field.
    pub fn field(
        type_name: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            field: Some(field.into()),
            reason: reason.into(),
        }
    }
}

/// Registry insertion and lookup errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// The schema failed its own registration checks
    #[error(transparent)]
    Definition(#[from] SchemaDefinitionError),

    /// A different contract is already registered under this type name
    #[error("conflicting schema for component type '{type_name}' is already registered")]
    DuplicateSchema { type_name: String },

    /// Lookup of a type name that was never registered
    #[error("unknown component type '{type_name}'")]
    UnknownComponentType { type_name: String },

    /// A link-time declaration built a schema under a different name
    #[error("component declared as '{declared}' built a schema named '{built}'")]
    DeclarationMismatch { declared: String, built: String },
}

impl RegistryError {
    pub fn unknown(type_name: impl Into<String>) -> Self {
        Self::UnknownComponentType {
            type_name: type_name.into(),
        }
    }

    pub fn duplicate(type_name: impl Into<String>) -> Self {
        Self::DuplicateSchema {
            type_name: type_name.into(),
        }
    }
}

/// Raised by summarizers and renderers when instance data is malformed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SummaryError {
    #[error("field '{field}' is missing")]
    MissingField { field: String },

    #[error("field '{field}' is malformed: {reason}")]
    Malformed { field: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl SummaryError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Projection could not be produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    /// The instance does not have the shape the schema describes
    #[error(transparent)]
    Invalid(#[from] ValidationFailure),

    /// A summarizer or renderer rejected the instance data
    #[error("summarizing '{type_name}' for {audience} failed: {source}")]
    Summary {
        type_name: String,
        audience: Audience,
        #[source]
        source: SummaryError,
    },
}

/// Raised by a mutator body when its arguments or preconditions are not met.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MutatorError {
    #[error("missing argument #{index} '{name}'")]
    MissingArgument { index: usize, name: String },

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("argument '{name}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Arguments were well-formed but the current state does not allow the operation
    #[error("rejected: {0}")]
    Rejected(String),
}

impl MutatorError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Write-path errors from the mutator dispatcher and direct field writes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MutationError {
    #[error("component '{type_name}' has no mutator '{operation}'")]
    UnknownMutator { type_name: String, operation: String },

    #[error("entity carries no '{type_name}' component")]
    MissingComponent { type_name: String },

    #[error("component '{type_name}' has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("field '{field}' of '{type_name}' is not directly mutable")]
    ImmutableField { type_name: String, field: String },

    /// Bad caller input: the mutator refused its arguments
    #[error("'{type_name}.{operation}' rejected its input: {source}")]
    InvalidArgument {
        type_name: String,
        operation: String,
        #[source]
        source: MutatorError,
    },

    /// Bad caller input on a direct field write
    #[error("rejected write: {0}")]
    InvalidValue(ValidationFailure),

    /// The stored component was already invalid before the operation
    #[error("stored component is invalid: {0}")]
    InvalidComponentState(ValidationFailure),

    /// Logic bug in the mutator: it produced a state the schema rejects
    #[error("'{operation}' broke a component invariant: {failure}")]
    PostMutationInvariant {
        operation: String,
        failure: ValidationFailure,
    },
}

/// An audience name that is not one of the five known audiences.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown audience '{0}' (expected player, llm, agent, user or dev)")]
pub struct ParseAudienceError(pub String);

/// Untrusted instance data could not be accepted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InstanceError {
    #[error("instance has no string 'type' tag")]
    MissingTypeTag,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Invalid(#[from] ValidationFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_definition_error_names_field() {
        let err = SchemaDefinitionError::field("needs", "hunger", "default outside range");
        assert_eq!(
            err.to_string(),
            "malformed schema 'needs' (field 'hunger'): default outside range"
        );
    }

    #[test]
    fn schema_definition_error_without_field() {
        let err = SchemaDefinitionError::schema("", "type name must be a non-empty identifier");
        assert_eq!(
            err.to_string(),
            "malformed schema '': type name must be a non-empty identifier"
        );
    }

    #[test]
    fn registry_error_wraps_definition_transparently() {
        let inner = SchemaDefinitionError::schema("needs", "version must be positive");
        let err: RegistryError = inner.clone().into();
        assert!(matches!(err, RegistryError::Definition(_)));
        assert_eq!(err.to_string(), inner.to_string());
    }

    #[test]
    fn duplicate_error_names_type() {
        let err = RegistryError::duplicate("inventory");
        assert!(err.to_string().contains("inventory"));
    }

    #[test]
    fn mutator_out_of_range_message() {
        let err = MutatorError::OutOfRange {
            name: "confidence".to_string(),
            value: 1.5,
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "argument 'confidence' = 1.5 is outside [0, 1]"
        );
    }
}
