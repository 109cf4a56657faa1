//! Position component - where an entity stands

use multiverse_schema::{
    declare_component, ComponentConfig, FieldDescriptor, InstanceReader, MutatorError,
    SchemaDefinition, SchemaDefinitionError, SummaryContext, SummaryError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TYPE_NAME: &str = "position";

pub const FACINGS: [&str; 4] = ["north", "east", "south", "west"];

/// Half-width of the playable world on each axis.
pub const WORLD_EXTENT: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub facing: String,
}

fn coordinate(name: &str) -> FieldDescriptor {
    FieldDescriptor::ranged(name, -WORLD_EXTENT, WORLD_EXTENT)
        .mutable()
        .group("coordinates")
}

fn summarize(instance: &Value, ctx: &SummaryContext<'_>) -> Result<String, SummaryError> {
    let reader = InstanceReader::new(instance)?;
    let x = reader.number("x")?;
    let y = reader.number("y")?;
    let facing = reader.string("facing")?;
    let place = match reader.opt_string("region")? {
        Some(region) => format!(" in {}", ctx.name_of(region)),
        None => String::new(),
    };
    Ok(format!("Standing at ({x}, {y}){place}, facing {facing}."))
}

pub fn schema() -> Result<SchemaDefinition, SchemaDefinitionError> {
    ComponentConfig::new(TYPE_NAME)
        .display_name("Position")
        .category("spatial")
        .icon("map-pin")
        .priority(20)
        .prompt_section("Location")
        .llm_priority(10)
        .field(coordinate("x").required().default_value(0.0))
        .field(coordinate("y").required().default_value(0.0))
        .field(coordinate("z"))
        .field(FieldDescriptor::reference("region", Some("region")).mutable())
        .field(
            FieldDescriptor::enumeration("facing", &FACINGS)
                .required()
                .default_value("north")
                .mutable(),
        )
        .default_from_fields()
        .summarize(summarize)
        .mutator("move_to", |instance, args| {
            let x = args.number(0, "x")?;
            let y = args.number(1, "y")?;
            let region = args.optional_string(2, "region")?;
            for (name, value) in [("x", x), ("y", y)] {
                if value.abs() > WORLD_EXTENT {
                    return Err(MutatorError::OutOfRange {
                        name: name.to_string(),
                        value,
                        min: -WORLD_EXTENT,
                        max: WORLD_EXTENT,
                    });
                }
            }
            instance["x"] = Value::from(x);
            instance["y"] = Value::from(y);
            if let Some(region) = region {
                if region.trim().is_empty() {
                    return Err(MutatorError::invalid("region", "must not be empty"));
                }
                instance["region"] = Value::from(region);
            }
            Ok(())
        })
        .mutator("face", |instance, args| {
            let facing = args.string(0, "facing")?;
            if !FACINGS.contains(&facing) {
                return Err(MutatorError::invalid(
                    "facing",
                    format!("'{facing}' is not a compass direction"),
                ));
            }
            instance["facing"] = Value::from(facing);
            Ok(())
        })
        .build()
}

declare_component!(TYPE_NAME, schema, ordinal = 20);

#[cfg(test)]
mod tests {
    use super::*;
    use multiverse_schema::{create_default, invoke, set_field, MutationError};
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn move_to_updates_coordinates_and_region() {
        let schema = schema().unwrap();
        let mut entity = HashMap::new();
        entity.insert(TYPE_NAME.to_string(), create_default(&schema).unwrap());

        invoke(&schema, &mut entity, "move_to", &[json!(3.0), json!(-4.5), json!("r-1")]).unwrap();
        let position: Position = serde_json::from_value(entity[TYPE_NAME].clone()).unwrap();
        assert_eq!((position.x, position.y), (3.0, -4.5));
        assert_eq!(position.region.as_deref(), Some("r-1"));

        let before = entity.clone();
        let err = invoke(&schema, &mut entity, "move_to", &[json!(1e9), json!(0)]).unwrap_err();
        assert!(matches!(
            err,
            MutationError::InvalidArgument { source: MutatorError::OutOfRange { .. }, .. }
        ));
        assert_eq!(entity, before);
    }

    #[test]
    fn coordinates_accept_direct_writes() {
        let schema = schema().unwrap();
        let mut entity = HashMap::new();
        entity.insert(TYPE_NAME.to_string(), create_default(&schema).unwrap());
        set_field(&schema, &mut entity, "facing", json!("west")).unwrap();
        assert!(set_field(&schema, &mut entity, "facing", json!("up")).is_err());
        assert_eq!(entity[TYPE_NAME]["facing"], "west");
    }

    #[test]
    fn summary_names_region() {
        let instance = json!({"type": TYPE_NAME, "x": 1.5, "y": 2.0, "region": "r-1", "facing": "east"});
        let names: HashMap<String, String> =
            [("r-1".to_string(), "the Salt Flats".to_string())].into_iter().collect();
        assert_eq!(
            summarize(&instance, &SummaryContext::with_resolver(&names)).unwrap(),
            "Standing at (1.5, 2) in the Salt Flats, facing east."
        );
    }
}
