//! Multiverse Schema - component schema definitions and introspection
//!
//! Every component type in the simulation is described by a [`SchemaDefinition`]:
//! its fields, defaults, validation rules, per-audience visibility and the named
//! mutators that are allowed to change it. Consumers (UI, prompt builders,
//! persistence, dev tools) look schemas up in a [`ComponentRegistry`] and run
//! the engines in this crate against them:
//!
//! - [`validate`] - structural, range and cross-field checks
//! - [`create_default`] - a valid fresh instance
//! - [`project`] - the audience-scoped view of an instance
//! - [`invoke`] / [`set_field`] - the sanctioned write paths
//!
//! # Design Principles
//!
//! 1. **Fail loud** - invalid data is reported, never clamped or defaulted
//! 2. **Data-driven** - instances are JSON objects tagged with their type name
//! 3. **Synchronous** - no engine blocks, performs I/O or awaits anything

pub mod audience;
pub mod context;
pub mod defaults;
pub mod digest;
pub mod error;
pub mod field;
pub mod hooks;
pub mod mutation;
pub mod projection;
pub mod registry;
pub mod schema;
pub mod validation;

pub use audience::{Audience, Visibility, VisibilityMatrix};
pub use context::{EntityResolver, InstanceReader, SummaryContext};
pub use defaults::create_default;
pub use digest::{llm_digest, render_digest, PromptSection};
pub use error::{
    InstanceError, MutationError, MutatorError, ParseAudienceError, ProjectionError,
    RegistryError, SchemaDefinitionError, SummaryError,
};
pub use field::{DisplayHints, FieldDefault, FieldDescriptor, FieldKind, NumericRange};
pub use hooks::Hook;
pub use mutation::{invoke, set_field, ComponentHost, MutatorArgs};
pub use projection::{project, project_with, ProjectedView, ProjectionOptions};
pub use registry::{
    auto_register, declarations, ComponentDeclaration, ComponentRegistry, DeclaredSchema, SchemaSet,
};
pub use schema::{
    define_component, ComponentConfig, ComponentMetadata, Invariant, LlmConfig, SchemaDefinition,
    SchemaDescription,
};
pub use validation::{validate, validate_field, FailureReason, FieldPath, ValidationFailure, TYPE_TAG};

#[doc(hidden)]
pub mod __private {
    pub use std::sync::OnceLock;

    pub use crate::registry::build_once;
    pub use inventory;
}
