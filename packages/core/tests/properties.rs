use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::{json, Value};
use shapegraph::{Fragment, ModelAssembler, ShapeId, TraitIndex, ViolationKind};

fn fragment(value: Value) -> Fragment {
    serde_json::from_value(value).unwrap()
}

fn scalar_type() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "string", "blob", "boolean", "integer", "long", "timestamp", "document", "structure", "union",
    ])
}

/// Definitions of `ns#A`, including aggregates whose members carry traits.
fn definition() -> impl Strategy<Value = Value> {
    prop_oneof![
        scalar_type().prop_map(|t| json!({"type": t})),
        "[a-z]{1,6}".prop_map(|name| json!({"type": "structure", "members": {
            name: {"target": "String", "traits": {"required": {}}}
        }})),
        Just(json!({"type": "list", "member": {"target": "String", "traits": {"length": {"min": 1}}}})),
        Just(json!({"type": "map", "key": {"target": "String"}, "value": {"target": "Integer"}})),
    ]
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn repeated_trait_application_is_idempotent(doc in "[a-z ]{0,24}", times in 1_usize..6) {
        let shape: ShapeId = "ns#A".parse().unwrap();
        let documentation = ShapeId::prelude("documentation");
        let value = json!(doc);
        let mut index = TraitIndex::new();
        for _ in 0..times {
            prop_assert!(index.apply(&shape, &documentation, value.clone()).is_ok());
        }
        prop_assert_eq!(index.get(&shape, &documentation), Some(&value));
    }

    #[test]
    fn tag_lists_concatenate_across_fragments(
        first in prop::collection::vec("[a-c]", 1..4),
        second in prop::collection::vec("[a-c]", 1..4),
    ) {
        prop_assume!(first != second);
        let mut assembler = ModelAssembler::new();
        assembler.add_fragment(fragment(json!({
            "namespace": "ns", "shapes": {"Hello": {"type": "string", "traits": {"tags": first.clone()}}}
        })));
        assembler.add_fragment(fragment(json!({"namespace": "ns", "apply": {"Hello": {"tags": second.clone()}}})));
        let merged = assembler.merge().unwrap();
        prop_assert!(merged.violations.is_empty());

        let expected: Vec<&String> = first.iter().chain(&second).collect();
        let hello: ShapeId = "ns#Hello".parse().unwrap();
        prop_assert_eq!(merged.model.traits().get_prelude(&hello, "tags"), Some(&json!(expected)));
    }

    #[test]
    fn identical_duplicates_never_conflict(shape_type in scalar_type(), copies in 2_usize..5) {
        let mut assembler = ModelAssembler::new();
        for _ in 0..copies {
            assembler.add_fragment(fragment(json!({"namespace": "ns", "shapes": {"A": {"type": shape_type}}})));
        }
        let merged = assembler.merge().unwrap();
        prop_assert!(!merged.violations.iter().any(|v| v.kind == ViolationKind::ShapeConflict));
    }

    #[test]
    fn duplicates_of_different_types_always_conflict(a in scalar_type(), b in scalar_type()) {
        prop_assume!(a != b);
        let mut assembler = ModelAssembler::new();
        assembler.add_fragment(fragment(json!({"namespace": "ns", "shapes": {"A": {"type": a}}})));
        assembler.add_fragment(fragment(json!({"namespace": "ns", "shapes": {"A": {"type": b}}})));
        let merged = assembler.merge().unwrap();
        let conflicts = merged.violations.iter().filter(|v| v.kind == ViolationKind::ShapeConflict).count();
        prop_assert_eq!(conflicts, 1);
    }

    #[test]
    fn differing_definitions_conflict_once_and_never_abort(a in definition(), b in definition()) {
        prop_assume!(a != b);
        let mut assembler = ModelAssembler::new();
        assembler.add_fragment(fragment(json!({"namespace": "ns", "shapes": {"A": a}})));
        assembler.add_fragment(fragment(json!({"namespace": "ns", "shapes": {"A": b}})));
        let merged = assembler.merge().unwrap();
        let conflicts = merged.violations.iter().filter(|v| v.kind == ViolationKind::ShapeConflict).count();
        prop_assert_eq!(conflicts, 1);
    }

    #[test]
    fn shape_ids_parse_what_they_print(
        namespace in "[a-z][a-z0-9]{0,6}(\\.[a-z][a-z0-9]{0,6}){0,2}",
        name in "[A-Z][A-Za-z0-9_]{0,10}",
        member in prop::option::of("[a-z][A-Za-z0-9]{0,8}"),
    ) {
        let id = ShapeId::from_parts(&namespace, &name, member.as_deref()).unwrap();
        let reparsed: ShapeId = id.to_string().parse().unwrap();
        prop_assert_eq!(reparsed, id);
    }
}
