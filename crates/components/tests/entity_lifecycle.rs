//! Entity lifecycle: build, mutate through the dispatcher, project and digest.

use multiverse_components::{registry, Entity, EntityDirectory};
use multiverse_schema::{
    invoke, llm_digest, project, render_digest, set_field, Audience, ComponentRegistry,
    MutationError, SummaryContext,
};
use serde_json::json;

fn villager(registry: &ComponentRegistry, name: &str) -> Entity {
    let mut entity = Entity::new();
    entity
        .attach(
            registry,
            json!({"type": "identity", "name": name, "species": "human", "age": 34}),
        )
        .unwrap();
    entity
        .backfill(registry, ["needs", "relationships", "inventory"])
        .unwrap();
    entity
}

#[test]
fn rejected_mutations_leave_the_entity_untouched() {
    let registry = registry().unwrap();
    let mut mara = villager(&registry, "Mara");
    let snapshot = mara.clone();

    let needs = registry.get("needs").unwrap();
    let err = invoke(&needs, &mut mara, "deplete", &[json!("hunger"), json!(-1.0)]).unwrap_err();
    assert!(matches!(err, MutationError::InvalidArgument { .. }));
    assert_eq!(mara, snapshot);

    let err = invoke(&needs, &mut mara, "teleport", &[]).unwrap_err();
    assert!(matches!(err, MutationError::UnknownMutator { .. }));
    assert_eq!(mara, snapshot);

    let beliefs = registry.get("beliefs").unwrap();
    let err = invoke(&beliefs, &mut mara, "drop", &[json!("sky")]).unwrap_err();
    assert_eq!(
        err,
        MutationError::MissingComponent {
            type_name: "beliefs".to_string()
        }
    );
    assert_eq!(mara, snapshot);
}

#[test]
fn direct_writes_respect_mutability_and_ranges() {
    let registry = registry().unwrap();
    let mut mara = villager(&registry, "Mara");
    let identity = registry.get("identity").unwrap();

    set_field(&identity, &mut mara, "name", json!("Mara the Bold")).unwrap();
    assert_eq!(mara.display_name(), Some("Mara the Bold"));

    let err = set_field(&identity, &mut mara, "species", json!("elf")).unwrap_err();
    assert!(matches!(err, MutationError::ImmutableField { .. }));

    let needs = registry.get("needs").unwrap();
    let err = set_field(&needs, &mut mara, "hunger", json!(0.5)).unwrap_err();
    assert!(matches!(err, MutationError::ImmutableField { .. }));
}

#[test]
fn projections_differ_by_audience() {
    let registry = registry().unwrap();
    let mut mara = villager(&registry, "Mara");
    let needs = registry.get("needs").unwrap();
    invoke(&needs, &mut mara, "deplete", &[json!("hunger"), json!(0.8)]).unwrap();

    let ctx = SummaryContext::new();
    let instance = mara.get("needs").unwrap();

    let player = project(&needs, instance, Audience::Player, &ctx).unwrap();
    let hunger = player.get("hunger").and_then(|v| v.as_f64()).unwrap();
    assert!((hunger - 0.2).abs() < 1e-9);

    let agent = project(&needs, instance, Audience::Agent, &ctx).unwrap();
    assert_eq!(agent.get("hunger"), Some(&json!("low")));

    let llm = project(&needs, instance, Audience::Llm, &ctx).unwrap();
    assert!(llm.summary.is_some());
}

#[test]
fn digest_resolves_related_entities_by_name() {
    let registry = registry().unwrap();
    let mut mara = villager(&registry, "Mara");
    let tam = villager(&registry, "Old Tam");

    let relationships = registry.get("relationships").unwrap();
    invoke(
        &relationships,
        &mut mara,
        "meet",
        &[json!(tam.id.to_string()), json!("friend")],
    )
    .unwrap();

    let mut directory = EntityDirectory::new();
    directory.insert(tam);

    let ctx = SummaryContext::with_resolver(&directory);
    let sections = llm_digest(&registry, &mara, &ctx).unwrap();
    let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names.first(), Some(&"Identity"));
    assert!(names.contains(&"Relationships"));

    let prompt = render_digest(&sections);
    assert!(prompt.starts_with("## Identity\n- Mara, a 34-year-old human"));
    assert!(prompt.contains("friend of Old Tam"));
    assert!(!prompt.contains(&mara.id.to_string()));
}
