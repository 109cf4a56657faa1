//! Component registry
//!
//! Maps component type names to their schema definitions. Registration is
//! append-only and copy-on-write: writers swap in a new state under a short
//! lock, readers clone an `Arc` snapshot and never block each other.
//!
//! Component modules declare their schema with [`declare_component!`]; the
//! declarations are collected at link time and inserted by
//! [`ComponentRegistry::register_declared`], so there is no central list to
//! maintain.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde_json::Value;

use crate::defaults;
use crate::error::{InstanceError, RegistryError, SchemaDefinitionError};
use crate::schema::SchemaDefinition;
use crate::validation::{self, TYPE_TAG};

// =============================================================================
// Link-time declarations
// =============================================================================

/// Result of building a declared schema, cached per declaration.
pub type DeclaredSchema = Result<Arc<SchemaDefinition>, SchemaDefinitionError>;

/// A component schema declared somewhere in the link graph.
///
/// Declarations are plain constant data. The schema behind `build` is built
/// once per process (see [`declare_component!`]), so every registry that
/// picks up the declaration shares the same definition.
pub struct ComponentDeclaration {
    /// Registration order (lower = earlier); ties break on type name
    pub ordinal: u16,
    pub type_name: &'static str,
    build: fn() -> DeclaredSchema,
}

impl ComponentDeclaration {
    pub const fn new(ordinal: u16, type_name: &'static str, build: fn() -> DeclaredSchema) -> Self {
        Self {
            ordinal,
            type_name,
            build,
        }
    }

    /// The declared schema, built on first call.
    pub fn schema(&self) -> Result<Arc<SchemaDefinition>, RegistryError> {
        let schema = (self.build)()?;
        if schema.type_name() != self.type_name {
            return Err(RegistryError::DeclarationMismatch {
                declared: self.type_name.to_string(),
                built: schema.type_name().to_string(),
            });
        }
        Ok(schema)
    }
}

inventory::collect!(ComponentDeclaration);

/// Builds a declared schema into `cell` on first use and hands out the cached
/// result afterwards. Called from [`declare_component!`] expansions.
#[doc(hidden)]
pub fn build_once(
    cell: &'static OnceLock<DeclaredSchema>,
    define: fn() -> Result<SchemaDefinition, SchemaDefinitionError>,
) -> DeclaredSchema {
    cell.get_or_init(|| define().map(Arc::new)).clone()
}

/// Declares a component schema for link-time registration.
///
/// ```ignore
/// declare_component!("needs", needs::schema);
/// declare_component!("identity", identity::schema, ordinal = 0);
/// ```
#[macro_export]
macro_rules! declare_component {
    ($type_name:expr, $define:path) => {
        $crate::declare_component!($type_name, $define, ordinal = 100);
    };
    ($type_name:expr, $define:path, ordinal = $ordinal:expr) => {
        // link-time collection is implemented with constructor sections
        #[allow(unsafe_code)]
        const _: () = {
            static BUILT: $crate::__private::OnceLock<$crate::DeclaredSchema> =
                $crate::__private::OnceLock::new();

            fn build() -> $crate::DeclaredSchema {
                $crate::__private::build_once(&BUILT, $define)
            }

            $crate::__private::inventory::submit! {
                $crate::ComponentDeclaration::new($ordinal, $type_name, build)
            }
        };
    };
}

/// All link-time declarations, ordered by `(ordinal, type_name)`.
pub fn declarations() -> Vec<&'static ComponentDeclaration> {
    let mut declared: Vec<_> = inventory::iter::<ComponentDeclaration>().collect();
    declared.sort_by_key(|decl| (decl.ordinal, decl.type_name));
    declared
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Default, Clone)]
struct RegistryState {
    ordered: Vec<Arc<SchemaDefinition>>,
    index: HashMap<String, usize>,
}

impl RegistryState {
    fn get(&self, type_name: &str) -> Option<&Arc<SchemaDefinition>> {
        self.index.get(type_name).map(|&slot| &self.ordered[slot])
    }
}

/// Registered schemas, keyed by type name.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    state: RwLock<Arc<RegistryState>>,
}

impl ComponentRegistry {
    /// An empty, isolated registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every link-time declaration.
    pub fn with_declared() -> Result<Self, RegistryError> {
        let registry = Self::new();
        registry.register_declared()?;
        Ok(registry)
    }

    /// Inserts `schema` after its self-check.
    ///
    /// Re-registering an identical schema is a no-op returning the stored
    /// definition; a different schema under a taken type name is an error.
    pub fn register(
        &self,
        schema: impl Into<Arc<SchemaDefinition>>,
    ) -> Result<Arc<SchemaDefinition>, RegistryError> {
        let schema = schema.into();
        schema.self_check()?;

        let mut state = self.state.write();
        if let Some(existing) = state.get(schema.type_name()) {
            if Arc::ptr_eq(existing, &schema) || **existing == *schema {
                tracing::trace!(type_name = %schema.type_name(), "Schema already registered");
                return Ok(Arc::clone(existing));
            }
            tracing::error!(
                type_name = %schema.type_name(),
                "Conflicting schema registration rejected"
            );
            return Err(RegistryError::duplicate(schema.type_name()));
        }

        let mut next = RegistryState::clone(&state);
        next.index
            .insert(schema.type_name().to_string(), next.ordered.len());
        next.ordered.push(Arc::clone(&schema));
        *state = Arc::new(next);

        tracing::debug!(
            type_name = %schema.type_name(),
            category = %schema.category(),
            fields = schema.fields().len(),
            "Registered component schema"
        );
        Ok(schema)
    }

    /// Registers every link-time declaration; returns how many were processed.
    pub fn register_declared(&self) -> Result<usize, RegistryError> {
        let declared = declarations();
        for declaration in &declared {
            self.register(declaration.schema()?)?;
        }
        Ok(declared.len())
    }

    /// Looks up a schema; unknown type names are an error, never a `None`.
    pub fn get(&self, type_name: &str) -> Result<Arc<SchemaDefinition>, RegistryError> {
        self.snapshot()
            .get(type_name)
            .cloned()
            .ok_or_else(|| RegistryError::unknown(type_name))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.snapshot().index.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.snapshot().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registered schema in registration order.
    ///
    /// The snapshot is unaffected by later registrations and can be iterated
    /// any number of times.
    pub fn all(&self) -> SchemaSet {
        SchemaSet {
            state: self.snapshot(),
        }
    }

    pub fn by_category(&self, category: &str) -> Vec<Arc<SchemaDefinition>> {
        self.snapshot()
            .ordered
            .iter()
            .filter(|schema| schema.category() == category)
            .cloned()
            .collect()
    }

    /// Validates untrusted instance data (e.g. from a save file) against the
    /// schema named by its `type` tag.
    pub fn check(&self, raw: &Value) -> Result<Arc<SchemaDefinition>, InstanceError> {
        let type_name = raw
            .get(TYPE_TAG)
            .and_then(Value::as_str)
            .ok_or(InstanceError::MissingTypeTag)?;
        let schema = self.get(type_name)?;
        validation::validate(&schema, raw)?;
        Ok(schema)
    }

    /// Valid default instance of a registered type.
    pub fn create_default(&self, type_name: &str) -> Result<Value, InstanceError> {
        let schema = self.get(type_name)?;
        Ok(defaults::create_default(&schema)?)
    }

    fn snapshot(&self) -> Arc<RegistryState> {
        Arc::clone(&self.state.read())
    }
}

/// Registers `schema` and hands back the stored definition, so a component
/// module can build and register in one expression.
pub fn auto_register(
    registry: &ComponentRegistry,
    schema: SchemaDefinition,
) -> Result<Arc<SchemaDefinition>, RegistryError> {
    registry.register(schema)
}

/// Point-in-time view of the registry contents.
#[derive(Debug, Clone)]
pub struct SchemaSet {
    state: Arc<RegistryState>,
}

impl SchemaSet {
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<SchemaDefinition>> {
        self.state.ordered.iter()
    }

    pub fn len(&self) -> usize {
        self.state.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.ordered.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|schema| schema.type_name())
    }
}

impl<'a> IntoIterator for &'a SchemaSet {
    type Item = &'a Arc<SchemaDefinition>;
    type IntoIter = std::slice::Iter<'a, Arc<SchemaDefinition>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
