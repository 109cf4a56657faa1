//! Personality component - Big Five trait scores
//!
//! Raw scores are hidden from players. Traits drift through `adjust`, which
//! refuses a drift that would leave `[0, 1]` instead of capping it.

use multiverse_schema::{
    declare_component, Audience, ComponentConfig, FieldDescriptor, InstanceReader, MutatorError,
    NumericRange, SchemaDefinition, SchemaDefinitionError, SummaryError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TYPE_NAME: &str = "personality";

pub const TRAITS: [&str; 5] = [
    "openness",
    "conscientiousness",
    "extraversion",
    "agreeableness",
    "neuroticism",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
        }
    }
}

fn descriptor(name: &'static str) -> (&'static str, &'static str) {
    match name {
        "openness" => ("curious", "conventional"),
        "conscientiousness" => ("disciplined", "careless"),
        "extraversion" => ("outgoing", "reserved"),
        "agreeableness" => ("warm", "prickly"),
        _ => ("anxious", "calm"),
    }
}

fn trait_word(name: &'static str, score: f64) -> Option<&'static str> {
    let (high, low) = descriptor(name);
    if score >= 0.7 {
        Some(high)
    } else if score <= 0.3 {
        Some(low)
    } else {
        None
    }
}

fn summarize(instance: &Value) -> Result<String, SummaryError> {
    let reader = InstanceReader::new(instance)?;
    let mut words = Vec::new();
    for name in TRAITS {
        if let Some(word) = trait_word(name, reader.number(name)?) {
            words.push(word);
        }
    }
    if words.is_empty() {
        Ok("Even-tempered, with no pronounced traits.".to_string())
    } else {
        Ok(format!("Comes across as {}.", words.join(", ")))
    }
}

pub fn schema() -> Result<SchemaDefinition, SchemaDefinitionError> {
    let mut config = ComponentConfig::new(TYPE_NAME)
        .display_name("Personality")
        .category("mind")
        .icon("brain")
        .priority(40)
        .prompt_section("Personality")
        .llm_priority(30);
    for name in TRAITS {
        config = config.field(
            FieldDescriptor::unit(name)
                .required()
                .default_value(0.5)
                .group("traits")
                .hidden_from(&[Audience::Player])
                .summarized_for(&[Audience::Agent])
                .summarize_with(move |value, _| {
                    let score = value
                        .as_f64()
                        .ok_or_else(|| SummaryError::malformed(name, "expected a number"))?;
                    Ok(trait_word(name, score).unwrap_or("unremarkable").to_string())
                }),
        );
    }
    config
        .default_from_fields()
        .summarize(|instance, _| summarize(instance))
        .mutator("adjust", |instance, args| {
            let name = args.string(0, "trait")?;
            let name = TRAITS
                .iter()
                .copied()
                .find(|candidate| *candidate == name)
                .ok_or_else(|| MutatorError::invalid("trait", format!("'{name}' is not a trait")))?;
            let delta = args.in_range(1, "delta", NumericRange::SIGNED_UNIT)?;
            let current = instance[name]
                .as_f64()
                .ok_or_else(|| MutatorError::rejected(format!("{name} is not a number")))?;
            let next = current + delta;
            if !NumericRange::UNIT.contains(next) {
                return Err(MutatorError::rejected(format!(
                    "{name} would drift to {next}, outside [0, 1]"
                )));
            }
            instance[name] = Value::from(next);
            Ok(())
        })
        .build()
}

declare_component!(TYPE_NAME, schema, ordinal = 40);
