//! Schema definitions and the `define_component` builder
//!
//! A [`SchemaDefinition`] is one component type: its field descriptors plus the
//! hooks that validate, default, summarize, render and mutate instances. It is
//! only constructible through [`ComponentConfig::build`] (or
//! [`define_component`]), which rejects structurally malformed configs. The
//! remaining self-consistency checks (defaults satisfy their own constraints)
//! run when the schema is registered.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::audience::Audience;
use crate::context::SummaryContext;
use crate::defaults;
use crate::error::{MutatorError, SchemaDefinitionError, SummaryError};
use crate::field::{FieldDescriptor, FieldKind};
use crate::hooks::{self, DefaultFn, Hook, MutatorFn, RenderFn, SummarizeFn, ValidateFn};
use crate::mutation::MutatorArgs;
use crate::validation::{self, FieldPath, TYPE_TAG};

// =============================================================================
// Component-level metadata
// =============================================================================

/// Presentation metadata shared by UI and dev tooling.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Display priority (lower = first)
    pub priority: i32,
}

/// Placement of the component's summary in LLM prompts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// Prompt section heading; falls back to the schema category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_section: Option<String>,
    /// Ordering within the prompt (lower = earlier)
    pub priority: i32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            prompt_section: None,
            priority: 100,
        }
    }
}

/// Named cross-field predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Invariant {
    pub name: String,
    pub check: Hook<ValidateFn>,
}

// =============================================================================
// Schema Definition
// =============================================================================

/// Complete description of one component type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDefinition {
    type_name: String,
    version: u32,
    category: String,
    display_name: Option<String>,
    description: Option<String>,
    metadata: ComponentMetadata,
    llm: LlmConfig,
    fields: Vec<FieldDescriptor>,
    invariants: Vec<Invariant>,
    factory: Hook<DefaultFn>,
    summarize: Option<Hook<SummarizeFn>>,
    mutators: BTreeMap<String, Hook<MutatorFn>>,
    renderers: BTreeMap<Audience, Hook<RenderFn>>,
}

impl SchemaDefinition {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Human-readable name; the type name when none was configured.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.type_name)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    pub fn llm(&self) -> &LlmConfig {
        &self.llm
    }

    /// Prompt section this component's summary belongs to.
    pub fn prompt_section(&self) -> &str {
        self.llm.prompt_section.as_deref().unwrap_or(&self.category)
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn invariants(&self) -> &[Invariant] {
        &self.invariants
    }

    pub fn summarizer(&self) -> Option<&Hook<SummarizeFn>> {
        self.summarize.as_ref()
    }

    pub fn mutator(&self, operation: &str) -> Option<&Hook<MutatorFn>> {
        self.mutators.get(operation)
    }

    pub fn mutator_names(&self) -> impl Iterator<Item = &str> {
        self.mutators.keys().map(String::as_str)
    }

    pub fn renderer(&self, audience: Audience) -> Option<&Hook<RenderFn>> {
        self.renderers.get(&audience)
    }

    /// Raw output of the author's factory. Not validated; see
    /// [`create_default`](crate::create_default) for the checked path.
    pub fn build_default(&self) -> Value {
        (self.factory)()
    }

    /// Serializable description for dev tooling.
    pub fn describe(&self) -> SchemaDescription<'_> {
        SchemaDescription {
            type_name: &self.type_name,
            version: self.version,
            category: &self.category,
            display_name: self.display_name(),
            description: self.description.as_deref(),
            metadata: &self.metadata,
            llm: &self.llm,
            fields: &self.fields,
            invariants: self.invariants.iter().map(|i| i.name.as_str()).collect(),
            mutators: self.mutator_names().collect(),
            renderers: self.renderers.keys().copied().collect(),
            has_summarizer: self.summarize.is_some(),
        }
    }

    /// Registration-time self-check: every field default satisfies its own
    /// descriptor, and the factory output validates against the schema.
    pub(crate) fn self_check(&self) -> Result<(), SchemaDefinitionError> {
        check_field_defaults(&self.type_name, &self.fields, &FieldPath::root())?;

        let instance = self.build_default();
        validation::validate(self, &instance).map_err(|failure| SchemaDefinitionError {
            type_name: self.type_name.clone(),
            field: failure.field().map(str::to_string),
            reason: format!("default instance is invalid: {}", failure.reason),
        })
    }
}

fn check_field_defaults(
    type_name: &str,
    fields: &[FieldDescriptor],
    parent: &FieldPath,
) -> Result<(), SchemaDefinitionError> {
    for field in fields {
        let path = parent.field(&field.name);
        if let Some(default) = &field.default {
            let value = default.resolve();
            validation::check_default(type_name, field, &value, parent).map_err(|failure| {
                SchemaDefinitionError::field(
                    type_name,
                    path.as_str(),
                    format!("default does not satisfy its own constraints: {}", failure.reason),
                )
            })?;
        }
        check_nested_defaults(type_name, &field.kind, &path)?;
    }
    Ok(())
}

fn check_nested_defaults(
    type_name: &str,
    kind: &FieldKind,
    path: &FieldPath,
) -> Result<(), SchemaDefinitionError> {
    match kind {
        FieldKind::Object { fields } => check_field_defaults(type_name, fields, path),
        FieldKind::Array { items, .. } => check_nested_defaults(type_name, items, &path.each()),
        FieldKind::Map {
            values: Some(values),
        } => check_nested_defaults(type_name, values, &path.each()),
        _ => Ok(()),
    }
}

/// Hook-free view of a schema for introspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescription<'a> {
    pub type_name: &'a str,
    pub version: u32,
    pub category: &'a str,
    pub display_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub metadata: &'a ComponentMetadata,
    pub llm: &'a LlmConfig,
    pub fields: &'a [FieldDescriptor],
    pub invariants: Vec<&'a str>,
    pub mutators: Vec<&'a str>,
    pub renderers: Vec<Audience>,
    pub has_summarizer: bool,
}

// =============================================================================
// Builder
// =============================================================================

/// Declarative config for one component type.
///
/// ```ignore
/// let needs = ComponentConfig::new("needs")
///     .category("physiology")
///     .field(FieldDescriptor::unit("hunger").required().default_value(1.0))
///     .default_from_fields()
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ComponentConfig {
    type_name: String,
    version: u32,
    category: String,
    display_name: Option<String>,
    description: Option<String>,
    metadata: ComponentMetadata,
    llm: LlmConfig,
    fields: Vec<FieldDescriptor>,
    invariants: Vec<Invariant>,
    factory: Option<Hook<DefaultFn>>,
    default_from_fields: bool,
    summarize: Option<Hook<SummarizeFn>>,
    mutators: Vec<(String, Hook<MutatorFn>)>,
    renderers: Vec<(Audience, Hook<RenderFn>)>,
}

impl ComponentConfig {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            version: 1,
            category: "general".to_string(),
            display_name: None,
            description: None,
            metadata: ComponentMetadata::default(),
            llm: LlmConfig::default(),
            fields: Vec::new(),
            invariants: Vec::new(),
            factory: None,
            default_from_fields: false,
            summarize: None,
            mutators: Vec::new(),
            renderers: Vec::new(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.metadata.icon = Some(icon.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.metadata.color = Some(color.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.metadata.priority = priority;
        self
    }

    pub fn prompt_section(mut self, section: impl Into<String>) -> Self {
        self.llm.prompt_section = Some(section.into());
        self
    }

    pub fn llm_priority(mut self, priority: i32) -> Self {
        self.llm.priority = priority;
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// The schema-wide `validate` predicate.
    pub fn validate(self, check: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.invariant("validate", check)
    }

    /// A named cross-field predicate; the name is reported on failure.
    pub fn invariant(
        mut self,
        name: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.invariants.push(Invariant {
            name: name.into(),
            check: hooks::validate_hook(check),
        });
        self
    }

    /// Explicit default factory.
    pub fn create_default(mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.factory = Some(hooks::default_hook(factory));
        self
    }

    /// Build the default instance from the field defaults.
    ///
    /// Required fields need a default unless they are arrays or maps (which
    /// start empty) or objects (built from their own nested defaults).
    pub fn default_from_fields(mut self) -> Self {
        self.default_from_fields = true;
        self
    }

    pub fn summarize(
        mut self,
        summarize: impl Fn(&Value, &SummaryContext<'_>) -> Result<String, SummaryError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.summarize = Some(hooks::summarize_hook(summarize));
        self
    }

    pub fn mutator(
        mut self,
        operation: impl Into<String>,
        mutate: impl Fn(&mut Value, &MutatorArgs<'_>) -> Result<(), MutatorError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.mutators
            .push((operation.into(), hooks::mutator_hook(mutate)));
        self
    }

    pub fn renderer(
        mut self,
        audience: Audience,
        render: impl Fn(&Value, &SummaryContext<'_>) -> Result<String, SummaryError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.renderers
            .push((audience, hooks::summarize_hook(render)));
        self
    }

    /// Checks the config's structure and produces an unregistered schema.
    pub fn build(self) -> Result<SchemaDefinition, SchemaDefinitionError> {
        let type_name = self.type_name;
        if !is_identifier(&type_name) {
            return Err(SchemaDefinitionError::schema(
                type_name,
                "type name must be a non-empty identifier",
            ));
        }
        if self.version == 0 {
            return Err(SchemaDefinitionError::schema(
                type_name,
                "version must be a positive integer",
            ));
        }
        check_descriptors(&type_name, &self.fields, &FieldPath::root())?;

        let factory = match (self.factory, self.default_from_fields) {
            (Some(_), true) => {
                return Err(SchemaDefinitionError::schema(
                    type_name,
                    "both create_default and default_from_fields were configured",
                ))
            }
            (Some(factory), false) => factory,
            (None, true) => defaults::factory_from_fields(&type_name, &self.fields)?,
            (None, false) => {
                return Err(SchemaDefinitionError::schema(
                    type_name,
                    "no default factory: call create_default or default_from_fields",
                ))
            }
        };

        let mut mutators = BTreeMap::new();
        for (operation, mutate) in self.mutators {
            if operation.trim().is_empty() {
                return Err(SchemaDefinitionError::schema(
                    type_name,
                    "mutator names must be non-empty",
                ));
            }
            if mutators.insert(operation.clone(), mutate).is_some() {
                return Err(SchemaDefinitionError::schema(
                    type_name,
                    format!("mutator '{operation}' is declared twice"),
                ));
            }
        }

        let mut renderers = BTreeMap::new();
        for (audience, render) in self.renderers {
            if renderers.insert(audience, render).is_some() {
                return Err(SchemaDefinitionError::schema(
                    type_name,
                    format!("renderer for {audience} is declared twice"),
                ));
            }
        }

        Ok(SchemaDefinition {
            type_name,
            version: self.version,
            category: self.category,
            display_name: self.display_name,
            description: self.description,
            metadata: self.metadata,
            llm: self.llm,
            fields: self.fields,
            invariants: self.invariants,
            factory,
            summarize: self.summarize,
            mutators,
            renderers,
        })
    }
}

/// Builds an unregistered schema from a config.
pub fn define_component(config: ComponentConfig) -> Result<SchemaDefinition, SchemaDefinitionError> {
    config.build()
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn check_descriptors(
    type_name: &str,
    fields: &[FieldDescriptor],
    parent: &FieldPath,
) -> Result<(), SchemaDefinitionError> {
    let mut seen = HashSet::new();
    for field in fields {
        let path = parent.field(&field.name);
        if !is_identifier(&field.name) {
            return Err(SchemaDefinitionError::field(
                type_name,
                path.as_str(),
                "field name must be a non-empty identifier",
            ));
        }
        if parent.is_root() && field.name == TYPE_TAG {
            return Err(SchemaDefinitionError::field(
                type_name,
                TYPE_TAG,
                "'type' is reserved for the component tag",
            ));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaDefinitionError::field(
                type_name,
                path.as_str(),
                "field is declared twice",
            ));
        }
        if let Some(constraint) = field.misapplied.first() {
            return Err(SchemaDefinitionError::field(
                type_name,
                path.as_str(),
                format!("{constraint} does not apply to a {} field", field.kind.name()),
            ));
        }
        check_kind(type_name, &field.kind, &path)?;
    }
    Ok(())
}

fn check_kind(
    type_name: &str,
    kind: &FieldKind,
    path: &FieldPath,
) -> Result<(), SchemaDefinitionError> {
    let malformed = |reason: &str| SchemaDefinitionError::field(type_name, path.as_str(), reason);
    match kind {
        FieldKind::Number {
            range: Some(range), ..
        } if !range.is_well_formed() => Err(malformed("range must be finite with min <= max")),
        FieldKind::Enum { values } => {
            if values.is_empty() {
                return Err(malformed("enum must list at least one value"));
            }
            let unique: HashSet<&String> = values.iter().collect();
            if unique.len() != values.len() {
                return Err(malformed("enum values must be unique"));
            }
            Ok(())
        }
        FieldKind::Array { items, .. } => check_kind(type_name, items, path),
        FieldKind::Map {
            values: Some(values),
        } => check_kind(type_name, values, path),
        FieldKind::Object { fields } => check_descriptors(type_name, fields, path),
        _ => Ok(()),
    }
}
