//! Beliefs component - what an agent holds to be true
//!
//! One belief per subject. Confidence is a probability in `[0, 1]`; a belief
//! may cite the entity it was learned from.

use multiverse_schema::{
    declare_component, Audience, ComponentConfig, FieldDescriptor, FieldKind, InstanceReader,
    MutatorError, SchemaDefinition, SchemaDefinitionError, SummaryContext, SummaryError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const TYPE_NAME: &str = "beliefs";

pub const MAX_BELIEFS: usize = 100;
pub const MAX_STATEMENT_LENGTH: usize = 280;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    pub subject: String,
    pub statement: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Beliefs {
    pub beliefs: Vec<Belief>,
}

fn belief_kind() -> FieldKind {
    FieldKind::object(vec![
        FieldDescriptor::string("subject").required().max_length(80),
        FieldDescriptor::string("statement")
            .required()
            .max_length(MAX_STATEMENT_LENGTH),
        FieldDescriptor::unit("confidence").required(),
        FieldDescriptor::reference("source", None),
    ])
}

fn summarize(instance: &Value, ctx: &SummaryContext<'_>) -> Result<String, SummaryError> {
    let beliefs = InstanceReader::new(instance)?.array("beliefs")?;
    if beliefs.is_empty() {
        return Ok("Holds no particular beliefs.".to_string());
    }
    let mut lines = Vec::with_capacity(beliefs.len());
    for (index, belief) in beliefs.iter().enumerate() {
        let field = format!("beliefs[{index}]");
        let statement = belief["statement"]
            .as_str()
            .ok_or_else(|| SummaryError::malformed(&field, "belief has no statement"))?;
        let confidence = belief["confidence"]
            .as_f64()
            .ok_or_else(|| SummaryError::malformed(&field, "belief has no confidence"))?;
        let mut line = format!("{statement} ({:.0}% sure", confidence * 100.0);
        if let Some(source) = belief["source"].as_str() {
            line.push_str(", heard from ");
            line.push_str(&ctx.name_of(source));
        }
        line.push(')');
        lines.push(line);
    }
    Ok(format!("Believes: {}.", lines.join("; ")))
}

pub fn schema() -> Result<SchemaDefinition, SchemaDefinitionError> {
    ComponentConfig::new(TYPE_NAME)
        .display_name("Beliefs")
        .category("mind")
        .icon("lightbulb")
        .priority(60)
        .prompt_section("Beliefs")
        .llm_priority(60)
        .field(
            FieldDescriptor::array("beliefs", belief_kind())
                .required()
                .max_items(MAX_BELIEFS)
                .hidden_from(&[Audience::Player, Audience::Agent])
                .summarized_for(&[Audience::Llm]),
        )
        .invariant("one_belief_per_subject", |instance| {
            let Some(beliefs) = instance["beliefs"].as_array() else {
                return true;
            };
            let mut subjects: Vec<&str> = beliefs.iter().filter_map(|b| b["subject"].as_str()).collect();
            subjects.sort_unstable();
            subjects.windows(2).all(|pair| pair[0] != pair[1])
        })
        .default_from_fields()
        .summarize(summarize)
        .mutator("add_belief", |instance, args| {
            let subject = args.identifier(0, "subject")?;
            let statement = args.string(1, "statement")?;
            if statement.trim().is_empty() {
                return Err(MutatorError::invalid("statement", "must not be empty"));
            }
            if statement.chars().count() > MAX_STATEMENT_LENGTH {
                return Err(MutatorError::invalid(
                    "statement",
                    format!("longer than {MAX_STATEMENT_LENGTH} characters"),
                ));
            }
            let confidence = args.unit_interval(2, "confidence")?;
            let source = args.optional_string(3, "source")?;

            let mut belief = Map::new();
            belief.insert("subject".to_string(), json!(subject));
            belief.insert("statement".to_string(), json!(statement));
            belief.insert("confidence".to_string(), json!(confidence));
            if let Some(source) = source {
                belief.insert("source".to_string(), json!(source));
            }

            let beliefs = beliefs_mut(instance)?;
            match beliefs.iter_mut().find(|b| b["subject"] == subject) {
                Some(existing) => *existing = Value::Object(belief),
                None => {
                    if beliefs.len() >= MAX_BELIEFS {
                        return Err(MutatorError::rejected("belief store is full"));
                    }
                    beliefs.push(Value::Object(belief));
                }
            }
            Ok(())
        })
        .mutator("revise", |instance, args| {
            let subject = args.identifier(0, "subject")?;
            let confidence = args.unit_interval(1, "confidence")?;
            let belief = beliefs_mut(instance)?
                .iter_mut()
                .find(|b| b["subject"] == subject)
                .ok_or_else(|| MutatorError::rejected(format!("no belief about '{subject}'")))?;
            belief["confidence"] = json!(confidence);
            Ok(())
        })
        .mutator("drop", |instance, args| {
            let subject = args.identifier(0, "subject")?;
            let beliefs = beliefs_mut(instance)?;
            let before = beliefs.len();
            beliefs.retain(|b| b["subject"] != subject);
            if beliefs.len() == before {
                return Err(MutatorError::rejected(format!("no belief about '{subject}'")));
            }
            Ok(())
        })
        .build()
}

fn beliefs_mut(instance: &mut Value) -> Result<&mut Vec<Value>, MutatorError> {
    instance["beliefs"]
        .as_array_mut()
        .ok_or_else(|| MutatorError::rejected("beliefs is not a list"))
}

declare_component!(TYPE_NAME, schema, ordinal = 60);

#[cfg(test)]
mod tests {
    use super::*;
    use multiverse_schema::{create_default, invoke, MutationError};
    use std::collections::HashMap;

    fn entity() -> (SchemaDefinition, HashMap<String, Value>) {
        let schema = schema().unwrap();
        let mut entity = HashMap::new();
        entity.insert(TYPE_NAME.to_string(), create_default(&schema).unwrap());
        (schema, entity)
    }

    #[test]
    fn add_belief_replaces_same_subject() {
        let (schema, mut entity) = entity();
        let args = [json!("well"), json!("The well is poisoned"), json!(0.4), json!("e-5")];
        invoke(&schema, &mut entity, "add_belief", &args).unwrap();
        let args = [json!("well"), json!("The well is safe"), json!(0.9)];
        invoke(&schema, &mut entity, "add_belief", &args).unwrap();

        let beliefs: Beliefs = serde_json::from_value(entity[TYPE_NAME].clone()).unwrap();
        assert_eq!(beliefs.beliefs.len(), 1);
        assert_eq!(beliefs.beliefs[0].statement, "The well is safe");
        assert_eq!(beliefs.beliefs[0].source, None);
    }

    #[test]
    fn confidence_outside_unit_interval_is_rejected() {
        let (schema, mut entity) = entity();
        let before = entity.clone();
        let err = invoke(
            &schema,
            &mut entity,
            "add_belief",
            &[json!("sky"), json!("The sky is green"), json!(1.2)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MutationError::InvalidArgument { source: MutatorError::OutOfRange { .. }, .. }
        ));
        assert_eq!(entity, before);
    }

    #[test]
    fn revise_and_drop() {
        let (schema, mut entity) = entity();
        invoke(&schema, &mut entity, "add_belief", &[json!("sky"), json!("It will rain"), json!(0.5)]).unwrap();
        invoke(&schema, &mut entity, "revise", &[json!("sky"), json!(0.8)]).unwrap();
        assert_eq!(entity[TYPE_NAME]["beliefs"][0]["confidence"], 0.8);
        invoke(&schema, &mut entity, "drop", &[json!("sky")]).unwrap();
        assert!(invoke(&schema, &mut entity, "drop", &[json!("sky")]).is_err());
    }

    #[test]
    fn summary_cites_sources_by_name() {
        let instance = json!({
            "type": TYPE_NAME,
            "beliefs": [{"subject": "well", "statement": "The well is poisoned", "confidence": 0.75, "source": "e-5"}]
        });
        let names: HashMap<String, String> = [("e-5".to_string(), "Old Tam".to_string())].into_iter().collect();
        assert_eq!(
            summarize(&instance, &SummaryContext::with_resolver(&names)).unwrap(),
            "Believes: The well is poisoned (75% sure, heard from Old Tam)."
        );
    }
}
