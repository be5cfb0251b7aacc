//! Where traits may be applied.

use std::collections::BTreeMap;

use crate::model::Model;
use crate::selector::Selector;
use crate::shape_id::ShapeId;
use crate::traits::{StructurallyExclusive, TraitDefinition};
use crate::types::ShapeType;
use crate::validation::{Validator, Violation, ViolationKind};

/// Every applied trait must be on a shape its definition's selector matches.
pub struct TraitTargetValidator;

impl Validator for TraitTargetValidator {
    fn name(&self) -> &'static str {
        "TraitTarget"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();
        for definition in sorted_definitions(model) {
            let applied = model.traits().shapes_with_trait(&definition.id);
            if applied.is_empty() || definition.selector.trim() == "*" {
                continue;
            }

            let selector = match Selector::parse(&definition.selector) {
                Ok(selector) => selector,
                Err(err) => {
                    violations.push(Violation::error(
                        ViolationKind::SelectorSyntax,
                        &definition.id,
                        format!("Invalid selector for trait `{}`: {}", definition.id, err),
                    ));
                    continue;
                }
            };

            let matched = selector.select(model);
            for shape in applied.into_iter().filter(|id| !matched.contains(*id)) {
                violations.push(Violation::error(
                    ViolationKind::TraitPlacement,
                    shape,
                    format!(
                        "Trait `{}` cannot be applied to `{}`. This trait may only be applied to shapes that match the following selector: {}",
                        definition.id, shape, definition.selector
                    ),
                ));
            }
        }
        violations
    }
}

/// Structurally exclusive traits appear at most once per structure.
pub struct StructurallyExclusiveValidator;

impl Validator for StructurallyExclusiveValidator {
    fn name(&self) -> &'static str {
        "StructurallyExclusive"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let exclusive: Vec<(&ShapeId, StructurallyExclusive)> = sorted_definitions(model)
            .into_iter()
            .filter_map(|d| d.structurally_exclusive.map(|kind| (&d.id, kind)))
            .collect();
        if exclusive.is_empty() {
            return Vec::new();
        }

        let mut violations = Vec::new();
        for shape in model.shapes_of_type(ShapeType::Structure) {
            for (trait_id, kind) in &exclusive {
                let offenders: Vec<&str> = shape
                    .members
                    .iter()
                    .filter(|(_, member)| match kind {
                        StructurallyExclusive::Member => model.traits().has(&member.id, trait_id),
                        StructurallyExclusive::Target => member
                            .target()
                            .is_some_and(|target| model.traits().has(target, trait_id)),
                    })
                    .map(|(name, _)| name.as_str())
                    .collect();
                if offenders.len() < 2 {
                    continue;
                }
                violations.push(Violation::error(
                    ViolationKind::TraitPlacement,
                    &shape.id,
                    match kind {
                        StructurallyExclusive::Member => format!(
                            "The `{}` trait can be applied to only a single member of a shape, but it was found on the following members: {}",
                            trait_id,
                            offenders.join(", ")
                        ),
                        StructurallyExclusive::Target => format!(
                            "Only a single member of a structure can target a shape marked with the `{}` trait, but it was targeted by the following members: {}",
                            trait_id,
                            offenders.join(", ")
                        ),
                    },
                ));
            }
        }
        violations
    }
}

fn sorted_definitions(model: &Model) -> Vec<&TraitDefinition> {
    let by_id: BTreeMap<&ShapeId, &TraitDefinition> =
        model.traits().definitions().map(|d| (&d.id, d)).collect();
    by_id.into_values().collect()
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ModelAssembler;
    use crate::fragment::Fragment;
    use serde_json::json;

    fn model(shapes: serde_json::Value) -> Model {
        let fragment: Fragment =
            serde_json::from_value(json!({"namespace": "ns", "shapes": shapes})).unwrap();
        let mut assembler = ModelAssembler::new();
        assembler.add_fragment(fragment);
        assembler.merge().unwrap().model
    }

    #[test]
    fn traits_outside_their_selector_are_rejected() {
        let m = model(json!({
            "Op": {"type": "operation", "traits": {"readonly": {}}},
            "Name": {"type": "string", "traits": {"readonly": {}, "pattern": "^a"}},
            "Count": {"type": "integer", "traits": {"pattern": "^a"}}
        }));
        let found = TraitTargetValidator.validate(&m);
        let placed: Vec<(String, String)> = found
            .iter()
            .map(|v| (v.shape_id.as_ref().unwrap().to_string(), v.message.clone()))
            .collect();
        assert_eq!(found.len(), 2, "{placed:#?}");
        assert!(found.iter().all(|v| v.kind == ViolationKind::TraitPlacement));
        assert!(placed
            .iter()
            .any(|(id, m)| id == "ns#Count" && m.starts_with("Trait `smithy.api#pattern` cannot be applied to `ns#Count`")));
        assert!(placed
            .iter()
            .any(|(id, m)| id == "ns#Name" && m.ends_with("selector: operation")));
    }

    #[test]
    fn malformed_definition_selectors_are_reported() {
        let m = model(json!({
            "broken": {"type": "structure", "traits": {"trait": {"selector": "structure >"}}},
            "S": {"type": "structure", "traits": {"broken": {}}}
        }));
        let found = TraitTargetValidator.validate(&m);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ViolationKind::SelectorSyntax);
        assert_eq!(found[0].shape_id, Some("ns#broken".parse().unwrap()));
    }

    #[test]
    fn member_exclusive_traits_appear_once() {
        let m = model(json!({
            "Blob": {"type": "blob"},
            "Input": {"type": "structure", "members": {
                "a": {"target": "Blob", "traits": {"httpPayload": {}}},
                "b": {"target": "Blob", "traits": {"httpPayload": {}}},
                "c": {"target": "Blob"}
            }}
        }));
        let found = StructurallyExclusiveValidator.validate(&m);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shape_id, Some("ns#Input".parse().unwrap()));
        assert!(found[0].message.ends_with("members: a, b"));
    }

    #[test]
    fn target_exclusive_traits_count_member_targets() {
        let m = model(json!({
            "only": {"type": "structure", "traits": {"trait": {"structurallyExclusive": "target"}}},
            "Marked": {"type": "string", "traits": {"only": {}}},
            "S": {"type": "structure", "members": {
                "x": {"target": "Marked"},
                "y": {"target": "Marked"}
            }},
            "T": {"type": "structure", "members": {"x": {"target": "Marked"}}}
        }));
        let found = StructurallyExclusiveValidator.validate(&m);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shape_id, Some("ns#S".parse().unwrap()));
    }
}
