//! Multiverse Components - gameplay component schemas
//!
//! Each module declares one component type with `declare_component!`; nothing
//! lists them centrally. [`registry`] builds a registry holding all of them.
//!
//! | Type            | Category    | Managed through                     |
//! |-----------------|-------------|-------------------------------------|
//! | `identity`      | identity    | direct writes (`name`, `pronouns`)  |
//! | `position`      | spatial     | `move_to`, `face`, direct writes    |
//! | `needs`         | physiology  | `satisfy`, `deplete`                |
//! | `inventory`     | possessions | `add_item`, `remove_item`, ...      |
//! | `personality`   | mind        | `adjust`                            |
//! | `relationships` | social      | `meet`, `adjust_affinity`, ...      |
//! | `beliefs`       | mind        | `add_belief`, `revise`, `drop`      |

pub mod beliefs;
pub mod component;
pub mod entity;
pub mod error;
pub mod identity;
pub mod ids;
pub mod inventory;
pub mod needs;
pub mod personality;
pub mod position;
pub mod relationships;

pub use component::{Component, ComponentKind};
pub use entity::{load_entity, Entity, EntityDirectory, LoadReport, RejectedInstance};
pub use error::ComponentError;
pub use ids::EntityId;

use multiverse_schema::{ComponentRegistry, RegistryError};

/// Registry holding every declared component schema.
pub fn registry() -> Result<ComponentRegistry, RegistryError> {
    ComponentRegistry::with_declared()
}

/// Registers every declared component into an existing registry.
pub fn register_all(registry: &ComponentRegistry) -> Result<usize, RegistryError> {
    registry.register_declared()
}
