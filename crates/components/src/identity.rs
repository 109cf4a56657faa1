//! Identity component - who an entity is

use multiverse_schema::{
    declare_component, Audience, ComponentConfig, FieldDescriptor, InstanceReader,
    SchemaDefinition, SchemaDefinitionError, SummaryError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TYPE_NAME: &str = "identity";

pub const SPECIES: [&str; 6] = ["human", "elf", "dwarf", "orc", "spirit", "animal"];

pub const MAX_NAME_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub species: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronouns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_name: Option<String>,
}

fn summarize(instance: &Value) -> Result<String, SummaryError> {
    let reader = InstanceReader::new(instance)?;
    let name = reader.string("name")?;
    let species = reader.string("species")?;
    let mut line = match reader.get("age") {
        Some(age) => {
            let age = age
                .as_f64()
                .ok_or_else(|| SummaryError::malformed("age", "expected a number"))?;
            format!("{name}, a {age}-year-old {species}")
        }
        None => format!("{name}, a {species}"),
    };
    if let Some(pronouns) = reader.opt_string("pronouns")? {
        line.push_str(&format!(" ({pronouns})"));
    }
    Ok(line)
}

pub fn schema() -> Result<SchemaDefinition, SchemaDefinitionError> {
    ComponentConfig::new(TYPE_NAME)
        .display_name("Identity")
        .description("Name and origin of an entity")
        .category("identity")
        .icon("id-card")
        .priority(0)
        .prompt_section("Identity")
        .llm_priority(0)
        .field(
            FieldDescriptor::string("name")
                .required()
                .max_length(MAX_NAME_LENGTH)
                .default_value("Unnamed")
                .mutable()
                .label("Name")
                .order(0),
        )
        .field(
            FieldDescriptor::enumeration("species", &SPECIES)
                .required()
                .default_value("human")
                .label("Species")
                .order(1),
        )
        .field(FieldDescriptor::integer("age", 0.0, 10_000.0).label("Age").order(2))
        .field(FieldDescriptor::string("pronouns").max_length(32).mutable())
        .field(
            FieldDescriptor::string("true_name")
                .max_length(MAX_NAME_LENGTH)
                .visible_only_to(&[Audience::Dev])
                .describe("Hidden name known only to the author"),
        )
        .default_from_fields()
        .summarize(|instance, _| summarize(instance))
        .renderer(Audience::Player, |instance, _| {
            InstanceReader::new(instance)?.string("name").map(str::to_string)
        })
        .build()
}

declare_component!(TYPE_NAME, schema, ordinal = 0);
