//! Inventory component - carried items and coin
//!
//! Items stack by `item_id`. The total quantity never exceeds `capacity`;
//! `add_item` refuses to overfill rather than dropping the excess.

use multiverse_schema::{
    declare_component, Audience, ComponentConfig, FieldDescriptor, FieldKind, InstanceReader,
    MutatorError, SchemaDefinition, SchemaDefinitionError, SummaryError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const TYPE_NAME: &str = "inventory";

pub const MAX_STACKS: usize = 64;
pub const MAX_QUANTITY: f64 = 9_999.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_id: String,
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub items: Vec<ItemStack>,
    pub capacity: u32,
    pub currency: u64,
}

impl Inventory {
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|stack| u64::from(stack.quantity)).sum()
    }
}

/// `None` when the item list or any stack's quantity is missing.
fn total_quantity(instance: &Value) -> Option<u64> {
    instance["items"]
        .as_array()?
        .iter()
        .map(|stack| stack["quantity"].as_u64())
        .sum()
}

fn within_capacity(instance: &Value) -> bool {
    match (total_quantity(instance), instance["capacity"].as_u64()) {
        (Some(total), Some(capacity)) => total <= capacity,
        _ => false,
    }
}

fn whole(instance: &Value, field: &str) -> Result<u64, MutatorError> {
    instance[field]
        .as_u64()
        .ok_or_else(|| MutatorError::rejected(format!("{field} is not a whole number")))
}

fn item_kind() -> FieldKind {
    FieldKind::object(vec![
        FieldDescriptor::reference("item_id", Some("item")).required(),
        FieldDescriptor::string("name").required().max_length(64),
        FieldDescriptor::integer("quantity", 1.0, MAX_QUANTITY).required(),
        FieldDescriptor::ranged("value", 0.0, 1_000_000.0).hidden_from(&[Audience::Agent]),
    ])
}

fn summarize(instance: &Value) -> Result<String, SummaryError> {
    let reader = InstanceReader::new(instance)?;
    let items = reader.array("items")?;
    let currency = reader.number("currency")?;
    let mut carried = Vec::with_capacity(items.len());
    for (index, stack) in items.iter().enumerate() {
        let field = format!("items[{index}]");
        let name = stack["name"]
            .as_str()
            .ok_or_else(|| SummaryError::malformed(&field, "stack has no name"))?;
        let quantity = stack["quantity"]
            .as_f64()
            .ok_or_else(|| SummaryError::malformed(&field, "stack has no quantity"))?;
        carried.push(format!("{quantity} {name}"));
    }
    let goods = if carried.is_empty() {
        "nothing".to_string()
    } else {
        carried.join(", ")
    };
    Ok(format!("Carries {goods}; {currency} coins."))
}

pub fn schema() -> Result<SchemaDefinition, SchemaDefinitionError> {
    ComponentConfig::new(TYPE_NAME)
        .display_name("Inventory")
        .description("Items carried by an entity")
        .category("possessions")
        .icon("backpack")
        .priority(30)
        .prompt_section("Possessions")
        .llm_priority(40)
        .field(
            FieldDescriptor::array("items", item_kind())
                .required()
                .max_items(MAX_STACKS)
                .label("Items")
                .widget("list"),
        )
        .field(
            FieldDescriptor::integer("capacity", 0.0, MAX_QUANTITY)
                .required()
                .default_value(20)
                .mutable()
                .label("Capacity"),
        )
        .field(
            FieldDescriptor::integer("currency", 0.0, 1_000_000_000.0)
                .required()
                .default_value(0)
                .hidden_from(&[Audience::Agent])
                .label("Coins"),
        )
        .invariant("within_capacity", within_capacity)
        .default_from_fields()
        .summarize(|instance, _| summarize(instance))
        .mutator("add_item", |instance, args| {
            let item_id = args.identifier(0, "item_id")?;
            let name = args.string(1, "name")?;
            let quantity = args.count(2, "quantity")?;
            if quantity == 0 {
                return Err(MutatorError::invalid("quantity", "must be at least 1"));
            }
            let capacity = whole(instance, "capacity")?;
            let total = total_quantity(instance)
                .ok_or_else(|| MutatorError::rejected("an item stack has no quantity"))?;
            if total + quantity > capacity {
                return Err(MutatorError::rejected("inventory is full"));
            }
            let items = items_mut(instance)?;
            match items.iter_mut().find(|stack| stack["item_id"] == item_id) {
                Some(stack) => {
                    let held = whole(stack, "quantity")?;
                    stack["quantity"] = json!(held + quantity);
                }
                None => items.push(json!({"item_id": item_id, "name": name, "quantity": quantity})),
            }
            Ok(())
        })
        .mutator("remove_item", |instance, args| {
            let item_id = args.identifier(0, "item_id")?;
            let quantity = args.count(1, "quantity")?;
            if quantity == 0 {
                return Err(MutatorError::invalid("quantity", "must be at least 1"));
            }
            let items = items_mut(instance)?;
            let slot = items
                .iter()
                .position(|stack| stack["item_id"] == item_id)
                .ok_or_else(|| MutatorError::rejected(format!("no '{item_id}' in inventory")))?;
            let held = whole(&items[slot], "quantity")?;
            if quantity > held {
                return Err(MutatorError::rejected(format!(
                    "cannot remove {quantity} '{item_id}', only {held} held"
                )));
            }
            if quantity == held {
                items.remove(slot);
            } else {
                items[slot]["quantity"] = json!(held - quantity);
            }
            Ok(())
        })
        .mutator("adjust_currency", |instance, args| {
            let delta = args.number(0, "delta")?;
            if delta.fract() != 0.0 {
                return Err(MutatorError::invalid("delta", "coins are whole numbers"));
            }
            let held = instance["currency"]
                .as_i64()
                .ok_or_else(|| MutatorError::rejected("currency is not a whole number"))?;
            let next = held + delta as i64;
            if next < 0 {
                return Err(MutatorError::rejected(format!(
                    "cannot spend {} coins, only {held} held",
                    -delta
                )));
            }
            instance["currency"] = json!(next);
            Ok(())
        })
        .build()
}

fn items_mut(instance: &mut Value) -> Result<&mut Vec<Value>, MutatorError> {
    instance["items"]
        .as_array_mut()
        .ok_or_else(|| MutatorError::rejected("items is not a list"))
}

declare_component!(TYPE_NAME, schema, ordinal = 30);

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
    fn add_item_stacks_by_id() {
        let (schema, mut entity) = entity();
        invoke(&schema, &mut entity, "add_item", &[json!("bread"), json!("Bread"), json!(2)]).unwrap();
        invoke(&schema, &mut entity, "add_item", &[json!("bread"), json!("Bread"), json!(3)]).unwrap();
        let inventory: Inventory = serde_json::from_value(entity[TYPE_NAME].clone()).unwrap();
        assert_eq!(inventory.items.len(), 1);
        assert_eq!(inventory.items[0].quantity, 5);
    }

    #[test]
    fn negative_quantity_is_rejected_without_change() {
        let (schema, mut entity) = entity();
        let before = entity.clone();
        let err = invoke(&schema, &mut entity, "add_item", &[json!("bread"), json!("Bread"), json!(-1)])
            .unwrap_err();
        assert!(matches!(err, MutationError::InvalidArgument { .. }));
        assert_eq!(entity, before);
    }

    #[test]
    fn overfilling_is_refused() {
        let (schema, mut entity) = entity();
        let err = invoke(&schema, &mut entity, "add_item", &[json!("stone"), json!("Stone"), json!(21)])
            .unwrap_err();
        match err {
            MutationError::InvalidArgument { source, .. } => {
                assert_eq!(source, MutatorError::rejected("inventory is full"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn remove_item_drops_empty_stacks() {
        let (schema, mut entity) = entity();
        invoke(&schema, &mut entity, "add_item", &[json!("bread"), json!("Bread"), json!(2)]).unwrap();
        invoke(&schema, &mut entity, "remove_item", &[json!("bread"), json!(1)]).unwrap();
        assert_eq!(entity[TYPE_NAME]["items"][0]["quantity"], 1);
        invoke(&schema, &mut entity, "remove_item", &[json!("bread"), json!(1)]).unwrap();
        assert_eq!(entity[TYPE_NAME]["items"], json!([]));
        assert!(invoke(&schema, &mut entity, "remove_item", &[json!("bread"), json!(1)]).is_err());
    }

    #[test]
    fn currency_cannot_go_negative() {
        let (schema, mut entity) = entity();
        invoke(&schema, &mut entity, "adjust_currency", &[json!(15)]).unwrap();
        assert!(invoke(&schema, &mut entity, "adjust_currency", &[json!(-20)]).is_err());
        assert_eq!(entity[TYPE_NAME]["currency"], 15);
    }

    #[test]
    fn capacity_check_fails_on_missing_quantities() {
        let stackless = json!({
            "type": TYPE_NAME,
            "capacity": 20,
            "currency": 0,
            "items": [{"item_id": "bread", "name": "Bread"}]
        });
        assert_eq!(total_quantity(&stackless), None);
        assert!(!within_capacity(&stackless));

        let uncapped = json!({"type": TYPE_NAME, "currency": 0, "items": []});
        assert!(!within_capacity(&uncapped));

        let full = json!({
            "type": TYPE_NAME,
            "capacity": 2,
            "currency": 0,
            "items": [{"item_id": "bread", "name": "Bread", "quantity": 2}]
        });
        assert_eq!(total_quantity(&full), Some(2));
        assert!(within_capacity(&full));
    }

    #[test]
    fn stack_counts_must_be_whole_numbers() {
        let stack = json!({"item_id": "bread", "name": "Bread"});
        assert_eq!(
            whole(&stack, "quantity").unwrap_err(),
            MutatorError::rejected("quantity is not a whole number")
        );
        assert_eq!(whole(&json!({"quantity": 3}), "quantity").unwrap(), 3);
    }

    #[test]
    fn summary_lists_stacks() {
        let instance = json!({
            "type": TYPE_NAME,
            "capacity": 20,
            "currency": 7,
            "items": [{"item_id": "bread", "name": "bread", "quantity": 2}]
        });
        assert_eq!(summarize(&instance).unwrap(), "Carries 2 bread; 7 coins.");
    }
}
