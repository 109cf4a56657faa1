//! Relationships component - bonds to other entities
//!
//! Bonds are keyed by the other entity's id. Summaries resolve those ids to
//! display names through the summary context when a resolver is supplied.

use std::collections::BTreeMap;

use multiverse_schema::{
    declare_component, Audience, ComponentConfig, FieldDescriptor, FieldKind, InstanceReader,
    MutatorError, NumericRange, SchemaDefinition, SchemaDefinitionError, SummaryContext,
    SummaryError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const TYPE_NAME: &str = "relationships";

pub const BOND_KINDS: [&str; 6] = [
    "stranger",
    "acquaintance",
    "friend",
    "rival",
    "family",
    "partner",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub kind: String,
    pub affinity: f64,
    pub trust: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationships {
    pub bonds: BTreeMap<String, Bond>,
}

fn bond_kind() -> FieldKind {
    FieldKind::object(vec![
        FieldDescriptor::enumeration("kind", &BOND_KINDS).required(),
        FieldDescriptor::new("affinity", FieldKind::ranged(-1.0, 1.0)).required(),
        FieldDescriptor::unit("trust").required().hidden_from(&[Audience::Player]),
    ])
}

fn summarize(instance: &Value, ctx: &SummaryContext<'_>) -> Result<String, SummaryError> {
    let bonds = InstanceReader::new(instance)?.map("bonds")?;
    if bonds.is_empty() {
        return Ok("Has no notable relationships.".to_string());
    }
    let mut lines = Vec::with_capacity(bonds.len());
    for (id, bond) in bonds {
        let field = format!("bonds[{id:?}]");
        let kind = bond["kind"]
            .as_str()
            .ok_or_else(|| SummaryError::malformed(&field, "bond has no kind"))?;
        let affinity = bond["affinity"]
            .as_f64()
            .ok_or_else(|| SummaryError::malformed(&field, "bond has no affinity"))?;
        lines.push(format!("{kind} of {} ({affinity:+.1})", ctx.name_of(id)));
    }
    Ok(format!("Knows: {}.", lines.join("; ")))
}

pub fn schema() -> Result<SchemaDefinition, SchemaDefinitionError> {
    ComponentConfig::new(TYPE_NAME)
        .display_name("Relationships")
        .description("Bonds to other entities, keyed by entity id")
        .category("social")
        .icon("users")
        .priority(50)
        .prompt_section("Relationships")
        .llm_priority(50)
        .field(
            FieldDescriptor::map("bonds", bond_kind())
                .required()
                .hidden_from(&[Audience::Agent])
                .summarized_for(&[Audience::Llm])
                .label("Bonds"),
        )
        .invariant("bond_keys_are_ids", |instance| {
            instance["bonds"]
                .as_object()
                .map_or(true, |bonds| bonds.keys().all(|id| !id.trim().is_empty()))
        })
        .default_from_fields()
        .summarize(summarize)
        .mutator("meet", |instance, args| {
            let other = args.identifier(0, "entity_id")?;
            let kind = match args.optional_string(1, "kind")? {
                Some(kind) if BOND_KINDS.contains(&kind) => kind,
                Some(kind) => {
                    return Err(MutatorError::invalid("kind", format!("'{kind}' is not a bond kind")))
                }
                None => "acquaintance",
            };
            let bonds = bonds_mut(instance)?;
            if bonds.contains_key(other) {
                return Err(MutatorError::rejected(format!("already knows '{other}'")));
            }
            bonds.insert(
                other.to_string(),
                json!({"kind": kind, "affinity": 0.0, "trust": 0.5}),
            );
            Ok(())
        })
        .mutator("adjust_affinity", |instance, args| {
            let other = args.identifier(0, "entity_id")?;
            let delta = args.in_range(1, "delta", NumericRange::new(-2.0, 2.0))?;
            shift_affinity(instance, other, delta)
        })
        .mutator("set_kind", |instance, args| {
            let other = args.identifier(0, "entity_id")?;
            let kind = args.string(1, "kind")?;
            if !BOND_KINDS.contains(&kind) {
                return Err(MutatorError::invalid("kind", format!("'{kind}' is not a bond kind")));
            }
            let bond = bonds_mut(instance)?
                .get_mut(other)
                .ok_or_else(|| MutatorError::rejected(format!("does not know '{other}'")))?;
            bond["kind"] = Value::from(kind);
            Ok(())
        })
        .mutator("forget", |instance, args| {
            let other = args.identifier(0, "entity_id")?;
            bonds_mut(instance)?
                .remove(other)
                .map(|_| ())
                .ok_or_else(|| MutatorError::rejected(format!("does not know '{other}'")))
        })
        .build()
}

fn shift_affinity(instance: &mut Value, other: &str, delta: f64) -> Result<(), MutatorError> {
    let bond = bonds_mut(instance)?
        .get_mut(other)
        .ok_or_else(|| MutatorError::rejected(format!("does not know '{other}'")))?;
    let current = bond["affinity"]
        .as_f64()
        .ok_or_else(|| MutatorError::rejected(format!("bond with '{other}' has no affinity")))?;
    let next = current + delta;
    if !NumericRange::SIGNED_UNIT.contains(next) {
        return Err(MutatorError::rejected(format!(
            "affinity would move to {next}, outside [-1, 1]"
        )));
    }
    bond["affinity"] = Value::from(next);
    Ok(())
}

fn bonds_mut(instance: &mut Value) -> Result<&mut serde_json::Map<String, Value>, MutatorError> {
    instance["bonds"]
        .as_object_mut()
        .ok_or_else(|| MutatorError::rejected("bonds is not a map"))
}

declare_component!(TYPE_NAME, schema, ordinal = 50);
