//! Every relationship must resolve, and resolve to the right kind of shape.

use std::collections::BTreeSet;

use crate::model::Model;
use crate::relationship::{relationships_of, Relationship, RelationshipType};
use crate::shape_id::ShapeId;
use crate::types::{Shape, ShapeType};
use crate::validation::{Validator, Violation, ViolationKind};

const MAX_SUGGESTION_DISTANCE: usize = 2;

const VALID_SET_TARGETS: [ShapeType; 8] = [
    ShapeType::Blob,
    ShapeType::String,
    ShapeType::Byte,
    ShapeType::Short,
    ShapeType::Integer,
    ShapeType::Long,
    ShapeType::BigInteger,
    ShapeType::BigDecimal,
];

pub struct TargetValidator;

impl Validator for TargetValidator {
    fn name(&self) -> &'static str {
        "Target"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();
        for shape in model.shapes() {
            for rel in relationships_of(shape) {
                if rel.rel == RelationshipType::Member {
                    // Container to its own member always resolves.
                    check_member_kind(model, shape, &rel, &mut violations);
                    continue;
                }
                match model.get_shape(&rel.neighbor) {
                    Some(target) => {
                        if let Some(v) = check_target(model, shape, target, rel.rel) {
                            violations.push(v);
                        }
                    }
                    None => violations.push(unresolved(model, shape, &rel)),
                }
            }
        }
        violations
    }
}

fn check_target(model: &Model, shape: &Shape, target: &Shape, rel: RelationshipType) -> Option<Violation> {
    let error = |message: String| Some(Violation::error(ViolationKind::InvalidTarget, &shape.id, message));

    if model.is_trait_definition(&target.id) {
        return error(format!(
            "Found a {} reference to trait definition `{}`. Trait definitions cannot be targeted by members or referenced by shapes in any other context other than applying them as traits.",
            rel, target.id
        ));
    }

    match rel {
        RelationshipType::MemberTarget => {
            let t = target.shape_type();
            if matches!(
                t,
                ShapeType::Service | ShapeType::Resource | ShapeType::Operation | ShapeType::Member
            ) {
                return error(format!("Members cannot target {} shapes, but found `{}`", t, target.id));
            }
            None
        }
        RelationshipType::Resource => expect_type(shape, target, rel, ShapeType::Resource),
        RelationshipType::Operation | RelationshipType::CollectionOperation => {
            expect_type(shape, target, rel, ShapeType::Operation)
        }
        RelationshipType::Create
        | RelationshipType::Put
        | RelationshipType::Read
        | RelationshipType::Update
        | RelationshipType::Delete
        | RelationshipType::List => {
            if target.shape_type() != ShapeType::Operation {
                return error(format!(
                    "Resource {} lifecycle operation must target an operation, but found `{}`",
                    rel, target.id
                ));
            }
            None
        }
        RelationshipType::Input | RelationshipType::Output => {
            if target.shape_type() != ShapeType::Structure {
                return expect_type(shape, target, rel, ShapeType::Structure);
            }
            if model.traits().has_prelude(&target.id, "error") {
                return error(format!(
                    "Operation {} targets an invalid structure `{}` that is marked with the `error` trait.",
                    rel, target.id
                ));
            }
            None
        }
        RelationshipType::Error => {
            if target.shape_type() != ShapeType::Structure {
                return expect_type(shape, target, rel, ShapeType::Structure);
            }
            if !model.traits().has_prelude(&target.id, "error") {
                return error(format!(
                    "`{}` cannot be bound as an error because it is not marked with the `error` trait.",
                    target.id
                ));
            }
            None
        }
        RelationshipType::Identifier => expect_type(shape, target, rel, ShapeType::String),
        RelationshipType::Member | RelationshipType::Trait => None,
    }
}

/// Map keys and set members have restricted targets.
fn check_member_kind(model: &Model, shape: &Shape, rel: &Relationship, violations: &mut Vec<Violation>) {
    let Some(member_name) = rel.neighbor.member() else {
        return;
    };
    let Some(target) = model.resolve_target(&rel.neighbor) else {
        return;
    };
    let t = target.shape_type();
    match (shape.shape_type(), member_name) {
        (ShapeType::Map, "key") if t != ShapeType::String => {
            violations.push(Violation::error(
                ViolationKind::InvalidTarget,
                &rel.neighbor,
                format!("Map key member targets `{}`, but is expected to target a string", target.id),
            ));
        }
        (ShapeType::Set, "member") if !VALID_SET_TARGETS.contains(&t) => {
            let valid: BTreeSet<&str> = VALID_SET_TARGETS.iter().map(|t| t.as_str()).collect();
            violations.push(Violation::error(
                ViolationKind::InvalidTarget,
                &rel.neighbor,
                format!(
                    "Set member targets `{}`, but sets can target only {}. You can model a collection of {} shapes by changing this shape to a list.",
                    target.id,
                    valid.into_iter().collect::<Vec<_>>().join(", "),
                    t
                ),
            ));
        }
        _ => {}
    }
}

fn expect_type(shape: &Shape, target: &Shape, rel: RelationshipType, expected: ShapeType) -> Option<Violation> {
    if target.shape_type() == expected {
        return None;
    }
    Some(Violation::error(
        ViolationKind::InvalidTarget,
        &shape.id,
        format!(
            "{} shape `{}` relationships must target a {} shape, but found `{}` ({})",
            shape.shape_type(),
            rel,
            expected,
            target.id,
            target.shape_type()
        ),
    ))
}

fn unresolved(model: &Model, shape: &Shape, rel: &Relationship) -> Violation {
    let suggestions = suggestions(model, &rel.neighbor);
    let suggestion_text = if suggestions.is_empty() {
        String::new()
    } else {
        format!(". Did you mean {}?", suggestions.join(", "))
    };

    let message = if rel.rel == RelationshipType::MemberTarget {
        format!(
            "member shape targets an unresolved shape `{}`{}",
            rel.neighbor, suggestion_text
        )
    } else {
        let label = rel.rel.to_string();
        let article = if label.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" };
        format!(
            "{} shape has {} `{}` relationship to an unresolved shape `{}`{}",
            shape.shape_type(),
            article,
            label,
            rel.neighbor,
            suggestion_text
        )
    };
    Violation::error(ViolationKind::ShapeNotFound, &shape.id, message)
}

/// Shape IDs closest to `target`, within the suggestion distance, sorted.
fn suggestions(model: &Model, target: &ShapeId) -> Vec<String> {
    let wanted = target.to_string();
    let mut floor = usize::MAX;
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    for shape in model.graph().root_shapes() {
        let candidate = shape.id.to_string();
        let Some(distance) = bounded_levenshtein(&wanted, &candidate, MAX_SUGGESTION_DISTANCE) else {
            continue;
        };
        if distance < floor {
            floor = distance;
            candidates.clear();
        }
        if distance == floor {
            candidates.insert(candidate);
        }
    }
    candidates.into_iter().collect()
}

/// Edit distance between `a` and `b`, or `None` when it exceeds `max`.
fn bounded_levenshtein(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j] + cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        if current.iter().min().is_some_and(|m| *m > max) {
            return None;
        }
        previous = current;
    }
    let distance = previous[b.len()];
    (distance <= max).then_some(distance)
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ModelAssembler;
    use crate::fragment::Fragment;
    use serde_json::json;

    fn violations(shapes: serde_json::Value) -> Vec<Violation> {
        let fragment: Fragment =
            serde_json::from_value(json!({"namespace": "ns", "shapes": shapes})).unwrap();
        let mut assembler = ModelAssembler::new();
        assembler.add_fragment(fragment);
        let model = assembler.merge().unwrap().model;
        TargetValidator.validate(&model)
    }

    #[test]
    fn levenshtein_is_bounded() {
        assert_eq!(bounded_levenshtein("ns#Foo", "ns#Foo", 2), Some(0));
        assert_eq!(bounded_levenshtein("ns#Foo", "ns#Fooo", 2), Some(1));
        assert_eq!(bounded_levenshtein("ns#Foo", "ns#Bar", 2), None);
    }

    #[test]
    fn unresolved_member_target_suggests_close_ids() {
        let found = violations(json!({
            "Widget": {"type": "string"},
            "S": {"type": "structure", "members": {"w": {"target": "Widgit"}}}
        }));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ViolationKind::ShapeNotFound);
        assert_eq!(found[0].shape_id, Some("ns#S$w".parse().unwrap()));
        assert_eq!(
            found[0].message,
            "member shape targets an unresolved shape `ns#Widgit`. Did you mean ns#Widget?"
        );
    }

    #[test]
    fn unresolved_operation_relationships_name_the_relationship() {
        let found = violations(json!({
            "Svc": {"type": "service", "version": "1", "operations": ["Missing"]}
        }));
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].message,
            "service shape has an `operation` relationship to an unresolved shape `ns#Missing`"
        );
    }

    #[test]
    fn checks_relationship_target_kinds() {
        let found = violations(json!({
            "Op": {"type": "operation", "input": "Err", "errors": ["Plain"]},
            "Err": {"type": "structure", "traits": {"error": "client"}},
            "Plain": {"type": "structure"},
            "Svc": {"type": "service", "version": "1", "operations": ["Plain"]},
            "S": {"type": "structure", "members": {"op": {"target": "Op"}}},
            "Keys": {"type": "map", "key": {"target": "Integer"}, "value": {"target": "String"}},
            "Flags": {"type": "set", "member": {"target": "Boolean"}}
        }));
        let messages: Vec<&str> = found.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(found.len(), 6, "{messages:#?}");
        assert!(found.iter().all(|v| v.kind == ViolationKind::InvalidTarget));
        assert!(messages.iter().any(|m| m.contains("that is marked with the `error` trait")));
        assert!(messages.iter().any(|m| m.contains("`ns#Plain` cannot be bound as an error")));
        assert!(messages.iter().any(|m| m.contains("`operation` relationships must target a operation shape")));
        assert!(messages.iter().any(|m| m.starts_with("Members cannot target operation shapes")));
        assert!(messages.iter().any(|m| m.starts_with("Map key member targets `smithy.api#Integer`")));
        assert!(messages.iter().any(|m| m.starts_with("Set member targets `smithy.api#Boolean`")));
    }

    #[test]
    fn members_cannot_target_trait_definitions() {
        let found = violations(json!({
            "myTrait": {"type": "structure", "traits": {"trait": {}}},
            "S": {"type": "structure", "members": {"t": {"target": "myTrait"}}}
        }));
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("reference to trait definition `ns#myTrait`"));
    }
}
