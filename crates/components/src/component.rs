//! Typed component payloads
//!
//! Gameplay code that wants compile-time field access converts between the
//! data-driven JSON instances and [`Component`]. Conversion in either direction
//! goes through the registry, so a typed value never bypasses validation.

use std::fmt;
use std::str::FromStr;

use multiverse_schema::{ComponentRegistry, TYPE_TAG};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::beliefs::{self, Beliefs};
use crate::error::ComponentError;
use crate::identity::{self, Identity};
use crate::inventory::{self, Inventory};
use crate::needs::{self, Needs};
use crate::personality::{self, Personality};
use crate::position::{self, Position};
use crate::relationships::{self, Relationships};

/// Closed set of component kinds shipped with this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Identity,
    Position,
    Needs,
    Inventory,
    Personality,
    Relationships,
    Beliefs,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Identity,
        ComponentKind::Position,
        ComponentKind::Needs,
        ComponentKind::Inventory,
        ComponentKind::Personality,
        ComponentKind::Relationships,
        ComponentKind::Beliefs,
    ];

    /// Registry type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Identity => identity::TYPE_NAME,
            Self::Position => position::TYPE_NAME,
            Self::Needs => needs::TYPE_NAME,
            Self::Inventory => inventory::TYPE_NAME,
            Self::Personality => personality::TYPE_NAME,
            Self::Relationships => relationships::TYPE_NAME,
            Self::Beliefs => beliefs::TYPE_NAME,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ComponentKind {
    type Err = ComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_name() == s)
            .ok_or_else(|| ComponentError::UnknownKind(s.to_string()))
    }
}

/// A component instance with a typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Identity(Identity),
    Position(Position),
    Needs(Needs),
    Inventory(Inventory),
    Personality(Personality),
    Relationships(Relationships),
    Beliefs(Beliefs),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Identity(_) => ComponentKind::Identity,
            Self::Position(_) => ComponentKind::Position,
            Self::Needs(_) => ComponentKind::Needs,
            Self::Inventory(_) => ComponentKind::Inventory,
            Self::Personality(_) => ComponentKind::Personality,
            Self::Relationships(_) => ComponentKind::Relationships,
            Self::Beliefs(_) => ComponentKind::Beliefs,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    /// Validates `instance` against its registered schema, then decodes it.
    pub fn from_instance(
        registry: &ComponentRegistry,
        instance: &Value,
    ) -> Result<Self, ComponentError> {
        let schema = registry.check(instance)?;
        // the tag names a registered schema; it must also be one of ours
        schema.type_name().parse::<ComponentKind>()?;
        serde_json::from_value(instance.clone())
            .map_err(|source| ComponentError::decode(schema.type_name(), source))
    }

    /// Encodes the payload and validates the result.
    pub fn into_instance(self, registry: &ComponentRegistry) -> Result<Value, ComponentError> {
        let type_name = self.type_name();
        let instance =
            serde_json::to_value(&self).map_err(|source| ComponentError::encode(type_name, source))?;
        debug_assert_eq!(instance.get(TYPE_TAG).and_then(Value::as_str), Some(type_name));
        registry.check(&instance)?;
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiverse_schema::InstanceError;
    use serde_json::json;

    fn registry() -> ComponentRegistry {
        ComponentRegistry::with_declared().unwrap()
    }

    #[test]
    fn kinds_match_registered_schemas() {
        let registry = registry();
        for kind in ComponentKind::ALL {
            assert!(registry.contains(kind.type_name()), "{kind}");
            assert_eq!(kind.type_name().parse::<ComponentKind>().unwrap(), kind);
        }
        assert!("dragon".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn typed_round_trip_through_registry() {
        let registry = registry();
        let needs = Component::Needs(Needs {
            hunger: 0.4,
            ..Needs::default()
        });
        let instance = needs.clone().into_instance(&registry).unwrap();
        assert_eq!(instance["type"], "needs");
        assert_eq!(Component::from_instance(&registry, &instance).unwrap(), needs);
    }

    #[test]
    fn typed_values_cannot_bypass_validation() {
        let registry = registry();
        let bad = Component::Needs(Needs {
            hunger: 1.5,
            ..Needs::default()
        });
        let err = bad.into_instance(&registry).unwrap_err();
        assert!(matches!(
            err,
            ComponentError::Instance(InstanceError::Invalid(ref f)) if f.field() == Some("hunger")
        ));
    }

    #[test]
    fn decoding_untrusted_data_validates_first() {
        let registry = registry();
        let raw = json!({"type": "personality", "openness": 2.0});
        assert!(matches!(
            Component::from_instance(&registry, &raw),
            Err(ComponentError::Instance(_))
        ));
    }
}
