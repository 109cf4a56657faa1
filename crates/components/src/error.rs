//! Errors for typed component access and entity loading

use multiverse_schema::{InstanceError, ValidationFailure};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComponentError {
    /// Instance data was rejected by its schema
    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// Valid instance that does not fit the typed payload
    #[error("cannot decode '{type_name}' payload: {source}")]
    Decode {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode '{type_name}' payload: {source}")]
    Encode {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown component kind '{0}'")]
    UnknownKind(String),
}

impl ComponentError {
    pub fn decode(type_name: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            type_name: type_name.into(),
            source,
        }
    }

    pub fn encode(type_name: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            type_name: type_name.into(),
            source,
        }
    }
}

impl From<ValidationFailure> for ComponentError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Instance(InstanceError::Invalid(failure))
    }
}
