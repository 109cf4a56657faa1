//! Entities as component containers
//!
//! An [`Entity`] holds validated component instances keyed by type name. It is
//! the [`ComponentHost`] the mutator dispatcher writes through, and the unit
//! persistence code loads and backfills.

use std::collections::BTreeMap;

use multiverse_schema::{
    ComponentHost, ComponentRegistry, EntityResolver, InstanceError, TYPE_TAG,
};
use serde::Serialize;
use serde_json::Value;

use crate::component::{Component, ComponentKind};
use crate::error::ComponentError;
use crate::ids::EntityId;
use crate::identity;

/// Serializes for inspection only; saved data comes back in through
/// [`load_entity`], which validates every instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Entity {
    pub id: EntityId,
    components: BTreeMap<String, Value>,
}

impl Entity {
    pub fn new() -> Self {
        Self::with_id(EntityId::new())
    }

    pub fn with_id(id: EntityId) -> Self {
        Self {
            id,
            components: BTreeMap::new(),
        }
    }

    /// Validates and attaches an instance, replacing any component of the same type.
    pub fn attach(
        &mut self,
        registry: &ComponentRegistry,
        instance: Value,
    ) -> Result<(), InstanceError> {
        let schema = registry.check(&instance)?;
        self.components
            .insert(schema.type_name().to_string(), instance);
        Ok(())
    }

    pub fn attach_typed(
        &mut self,
        registry: &ComponentRegistry,
        component: Component,
    ) -> Result<(), ComponentError> {
        let type_name = component.type_name();
        let instance = component.into_instance(registry)?;
        self.components.insert(type_name.to_string(), instance);
        Ok(())
    }

    /// Attaches the default instance of `type_name`.
    pub fn attach_default(
        &mut self,
        registry: &ComponentRegistry,
        type_name: &str,
    ) -> Result<(), InstanceError> {
        let instance = registry.create_default(type_name)?;
        self.components.insert(type_name.to_string(), instance);
        Ok(())
    }

    /// Adds defaults for every listed type the entity lacks; returns the
    /// type names that were added.
    pub fn backfill<'a>(
        &mut self,
        registry: &ComponentRegistry,
        type_names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<String>, InstanceError> {
        let mut added = Vec::new();
        for type_name in type_names {
            if self.components.contains_key(type_name) {
                continue;
            }
            self.attach_default(registry, type_name)?;
            added.push(type_name.to_string());
        }
        if !added.is_empty() {
            tracing::debug!(entity = %self.id, added = ?added, "Backfilled missing components");
        }
        Ok(added)
    }

    pub fn has(&self, type_name: &str) -> bool {
        self.components.contains_key(type_name)
    }

    pub fn get(&self, type_name: &str) -> Option<&Value> {
        self.components.get(type_name)
    }

    pub fn remove(&mut self, type_name: &str) -> Option<Value> {
        self.components.remove(type_name)
    }

    /// Typed view of one component, validated on the way out.
    pub fn typed(
        &self,
        registry: &ComponentRegistry,
        kind: ComponentKind,
    ) -> Result<Option<Component>, ComponentError> {
        self.components
            .get(kind.type_name())
            .map(|instance| Component::from_instance(registry, instance))
            .transpose()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.components
            .iter()
            .map(|(type_name, instance)| (type_name.as_str(), instance))
    }

    /// Instances in type-name order, the form [`load_entity`] reads back.
    pub fn saved_instances(&self) -> Vec<Value> {
        self.components.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Display name from the identity component, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.components
            .get(identity::TYPE_NAME)
            .and_then(|identity| identity.get("name"))
            .and_then(Value::as_str)
    }
}

impl ComponentHost for Entity {
    fn component(&self, type_name: &str) -> Option<&Value> {
        self.components.get(type_name)
    }

    fn component_mut(&mut self, type_name: &str) -> Option<&mut Value> {
        self.components.get_mut(type_name)
    }
}

// =============================================================================
// Loading saved data
// =============================================================================

/// A saved instance that failed validation and was left out.
#[derive(Debug)]
pub struct RejectedInstance {
    /// Position in the saved list
    pub index: usize,
    pub type_name: Option<String>,
    pub error: InstanceError,
}

/// Result of loading one entity from untrusted saved data.
#[derive(Debug)]
pub struct LoadReport {
    pub entity: Entity,
    pub rejected: Vec<RejectedInstance>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Builds an entity from saved instances, validating each one.
///
/// Invalid instances are reported, never repaired; the caller decides
/// whether to discard them, backfill defaults or abort the load.
pub fn load_entity(
    registry: &ComponentRegistry,
    id: EntityId,
    saved: impl IntoIterator<Item = Value>,
) -> LoadReport {
    let mut entity = Entity::with_id(id);
    let mut rejected = Vec::new();
    for (index, instance) in saved.into_iter().enumerate() {
        let type_name = instance
            .get(TYPE_TAG)
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Err(error) = entity.attach(registry, instance) {
            tracing::warn!(
                entity = %id,
                index,
                type_name = type_name.as_deref().unwrap_or("<untagged>"),
                error = %error,
                "Rejected saved component"
            );
            rejected.push(RejectedInstance {
                index,
                type_name,
                error,
            });
        }
    }
    LoadReport { entity, rejected }
}

// =============================================================================
// Name resolution
// =============================================================================

/// Entities by id; resolves ids to names through their identity components.
#[derive(Debug, Clone, Default)]
pub struct EntityDirectory {
    entities: BTreeMap<String, Entity>,
}

impl EntityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.id.to_string(), entity);
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityResolver for EntityDirectory {
    fn display_name(&self, entity_id: &str) -> Option<String> {
        self.entities
            .get(entity_id)
            .and_then(Entity::display_name)
            .map(str::to_string)
    }
}
