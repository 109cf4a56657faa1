//! Summary context and instance reading helpers
//!
//! [`SummaryContext`] is the only place external identity resolution enters the
//! schema layer. A missing resolver, or a resolver that does not know an id,
//! degrades to printing the raw identifier.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::SummaryError;

/// Maps entity identifiers to display names.
#[cfg_attr(test, mockall::automock)]
pub trait EntityResolver: Send + Sync {
    /// Display name for `entity_id`, or `None` when unknown.
    fn display_name(&self, entity_id: &str) -> Option<String>;
}

impl EntityResolver for HashMap<String, String> {
    fn display_name(&self, entity_id: &str) -> Option<String> {
        self.get(entity_id).cloned()
    }
}

/// Context handed to summarizers and renderers.
#[derive(Clone, Copy, Default)]
pub struct SummaryContext<'a> {
    resolver: Option<&'a dyn EntityResolver>,
}

impl<'a> SummaryContext<'a> {
    /// Context without identity resolution.
    pub fn new() -> Self {
        Self { resolver: None }
    }

    pub fn with_resolver(resolver: &'a dyn EntityResolver) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    /// Display name for `entity_id`, falling back to the id itself.
    pub fn name_of(&self, entity_id: &str) -> String {
        self.resolver
            .and_then(|resolver| resolver.display_name(entity_id))
            .unwrap_or_else(|| entity_id.to_string())
    }
}

impl fmt::Debug for SummaryContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryContext")
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Typed, failing reads over an instance object.
///
/// Summarizers use this so that malformed data raises a [`SummaryError`]
/// instead of being papered over with a fallback string.
#[derive(Debug, Clone, Copy)]
pub struct InstanceReader<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> InstanceReader<'a> {
    pub fn new(instance: &'a Value) -> Result<Self, SummaryError> {
        instance
            .as_object()
            .map(|fields| Self { fields })
            .ok_or_else(|| SummaryError::Other("instance is not an object".to_string()))
    }

    /// Raw value of an optional field; `null` reads as absent.
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|value| !value.is_null())
    }

    pub fn require(&self, field: &str) -> Result<&'a Value, SummaryError> {
        self.get(field).ok_or_else(|| SummaryError::missing(field))
    }

    pub fn number(&self, field: &str) -> Result<f64, SummaryError> {
        self.require(field)?
            .as_f64()
            .ok_or_else(|| SummaryError::malformed(field, "expected a number"))
    }

    pub fn string(&self, field: &str) -> Result<&'a str, SummaryError> {
        self.require(field)?
            .as_str()
            .ok_or_else(|| SummaryError::malformed(field, "expected a string"))
    }

    pub fn opt_string(&self, field: &str) -> Result<Option<&'a str>, SummaryError> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| SummaryError::malformed(field, "expected a string")),
        }
    }

    pub fn boolean(&self, field: &str) -> Result<bool, SummaryError> {
        self.require(field)?
            .as_bool()
            .ok_or_else(|| SummaryError::malformed(field, "expected a boolean"))
    }

    pub fn array(&self, field: &str) -> Result<&'a [Value], SummaryError> {
        self.require(field)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| SummaryError::malformed(field, "expected an array"))
    }

    pub fn map(&self, field: &str) -> Result<&'a Map<String, Value>, SummaryError> {
        self.require(field)?
            .as_object()
            .ok_or_else(|| SummaryError::malformed(field, "expected a map"))
    }
}
