//! Needs component - physiological drives
//!
//! Every need is a level in `[0, 1]` where 1.0 means fully satisfied. Players
//! see the raw bars; the LLM and other agents get descriptive words instead.

use multiverse_schema::{
    declare_component, Audience, ComponentConfig, FieldDescriptor, InstanceReader, MutatorError,
    SchemaDefinition, SchemaDefinitionError, SummaryError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TYPE_NAME: &str = "needs";

/// Need fields in declaration order.
pub const NEEDS: [&str; 4] = ["hunger", "thirst", "energy", "health"];

/// Level below which a need is reported as pressing.
pub const PRESSING: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Needs {
    pub hunger: f64,
    pub thirst: f64,
    pub energy: f64,
    pub health: f64,
}

impl Default for Needs {
    fn default() -> Self {
        Self {
            hunger: 1.0,
            thirst: 1.0,
            energy: 1.0,
            health: 1.0,
        }
    }
}

/// Word for a need level.
pub fn level_word(level: f64) -> &'static str {
    match level {
        l if l < 0.1 => "critical",
        l if l < PRESSING => "low",
        l if l < 0.7 => "moderate",
        _ => "satisfied",
    }
}

fn need_field(name: &str, label: &str) -> FieldDescriptor {
    FieldDescriptor::unit(name)
        .required()
        .default_value(1.0)
        .label(label)
        .widget("bar")
        .group("needs")
        .summarized_for(&[Audience::Llm, Audience::Agent])
        .summarize_with(|value, _| {
            value
                .as_f64()
                .map(|level| level_word(level).to_string())
                .ok_or_else(|| SummaryError::Other("need level is not a number".to_string()))
        })
}

fn summarize(instance: &Value) -> Result<String, SummaryError> {
    let reader = InstanceReader::new(instance)?;
    let mut pressing = Vec::new();
    for need in NEEDS {
        let level = reader.number(need)?;
        if level < PRESSING {
            pressing.push(format!("{need} is {}", level_word(level)));
        }
    }
    if pressing.is_empty() {
        Ok("All needs are met.".to_string())
    } else {
        Ok(format!("Pressing needs: {}.", pressing.join(", ")))
    }
}

pub fn schema() -> Result<SchemaDefinition, SchemaDefinitionError> {
    ComponentConfig::new(TYPE_NAME)
        .display_name("Needs")
        .description("Physiological drives; 1.0 is fully satisfied")
        .category("physiology")
        .icon("heart")
        .color("#d9534f")
        .priority(10)
        .prompt_section("Status")
        .llm_priority(20)
        .field(need_field("hunger", "Hunger"))
        .field(need_field("thirst", "Thirst"))
        .field(need_field("energy", "Energy"))
        .field(need_field("health", "Health"))
        .default_from_fields()
        .summarize(|instance, _| summarize(instance))
        // satiation saturates at 1.0
        .mutator("satisfy", |instance, args| {
            let need = need_arg(args.string(0, "need")?)?;
            let amount = args.unit_interval(1, "amount")?;
            let level = current_level(instance, need)?;
            instance[need] = Value::from((level + amount).min(1.0));
            Ok(())
        })
        // depletion bottoms out at 0.0
        .mutator("deplete", |instance, args| {
            let need = need_arg(args.string(0, "need")?)?;
            let amount = args.unit_interval(1, "amount")?;
            let level = current_level(instance, need)?;
            instance[need] = Value::from((level - amount).max(0.0));
            Ok(())
        })
        .build()
}

fn need_arg(name: &str) -> Result<&'static str, MutatorError> {
    NEEDS
        .iter()
        .copied()
        .find(|need| *need == name)
        .ok_or_else(|| MutatorError::invalid("need", format!("'{name}' is not a need")))
}

fn current_level(instance: &Value, need: &str) -> Result<f64, MutatorError> {
    instance[need]
        .as_f64()
        .ok_or_else(|| MutatorError::rejected(format!("{need} is not a number")))
}

declare_component!(TYPE_NAME, schema, ordinal = 10);

#[cfg(test)]
mod tests {
    use super::*;
    use multiverse_schema::{create_default, invoke, project, SummaryContext};
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn default_is_fully_satisfied() {
        let schema = schema().unwrap();
        let instance = create_default(&schema).unwrap();
        let needs: Needs = serde_json::from_value(instance).unwrap();
        assert_eq!(needs, Needs::default());
    }

    #[test]
    fn summary_lists_pressing_needs() {
        let instance = json!({"type": TYPE_NAME, "hunger": 0.05, "thirst": 0.2, "energy": 0.9, "health": 1.0});
        assert_eq!(
            summarize(&instance).unwrap(),
            "Pressing needs: hunger is critical, thirst is low."
        );
        let content = json!({"type": TYPE_NAME, "hunger": 0.9, "thirst": 0.9, "energy": 0.9, "health": 0.9});
        assert_eq!(summarize(&content).unwrap(), "All needs are met.");
    }

    #[test]
    fn summary_fails_on_missing_need() {
        let instance = json!({"type": TYPE_NAME, "hunger": 0.5});
        assert_eq!(summarize(&instance), Err(SummaryError::missing("thirst")));
    }

    #[test]
    fn agents_see_words_players_see_bars() {
        let schema = schema().unwrap();
        let instance = json!({"type": TYPE_NAME, "hunger": 0.2, "thirst": 1.0, "energy": 0.5, "health": 1.0});
        let ctx = SummaryContext::new();
        let agent = project(&schema, &instance, Audience::Agent, &ctx).unwrap();
        assert_eq!(agent.get("hunger"), Some(&json!("low")));
        let player = project(&schema, &instance, Audience::Player, &ctx).unwrap();
        assert_eq!(player.get("hunger"), Some(&json!(0.2)));
    }

    #[test]
    fn satisfy_and_deplete() {
        let schema = schema().unwrap();
        let mut entity = HashMap::new();
        entity.insert(TYPE_NAME.to_string(), create_default(&schema).unwrap());

        invoke(&schema, &mut entity, "deplete", &[json!("hunger"), json!(0.75)]).unwrap();
        assert_eq!(entity[TYPE_NAME]["hunger"], 0.25);
        invoke(&schema, &mut entity, "satisfy", &[json!("hunger"), json!(1.0)]).unwrap();
        assert_eq!(entity[TYPE_NAME]["hunger"], 1.0);

        let before = entity.clone();
        assert!(invoke(&schema, &mut entity, "deplete", &[json!("hunger"), json!(1.5)]).is_err());
        assert!(invoke(&schema, &mut entity, "deplete", &[json!("mana"), json!(0.1)]).is_err());
        assert_eq!(entity, before);
    }
}
