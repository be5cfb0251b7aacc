//! Shape IDs that differ only by case.

use std::collections::BTreeMap;

use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::validation::{Validator, Violation, ViolationKind};

pub struct ShapeIdConflictValidator;

impl Validator for ShapeIdConflictValidator {
    fn name(&self) -> &'static str {
        "ShapeIdConflict"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();

        let mut by_key: BTreeMap<String, Vec<&ShapeId>> = BTreeMap::new();
        for shape in model.graph().root_shapes() {
            by_key.entry(shape.id.case_key()).or_default().push(&shape.id);
        }
        for ids in by_key.values().filter(|ids| ids.len() > 1) {
            for id in ids {
                let others: Vec<String> = ids
                    .iter()
                    .filter(|other| *other != id)
                    .map(|other| format!("`{}`", other))
                    .collect();
                violations.push(Violation::error(
                    ViolationKind::ShapeConflict,
                    id,
                    format!(
                        "Shape ID `{}` conflicts with other shape IDs in the model: [{}]",
                        id,
                        others.join(", ")
                    ),
                ));
            }
        }

        for shape in model.graph().root_shapes() {
            let mut members: BTreeMap<String, Vec<&str>> = BTreeMap::new();
            for name in shape.members.keys() {
                members.entry(name.to_lowercase()).or_default().push(name);
            }
            for names in members.values().filter(|names| names.len() > 1) {
                violations.push(Violation::error(
                    ViolationKind::ShapeConflict,
                    &shape.id,
                    format!(
                        "Member names must be case-insensitively unique, but found conflicting members: {}",
                        names.iter().map(|n| format!("`{}`", n)).collect::<Vec<_>>().join(", ")
                    ),
                ));
            }
        }

        violations
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ShapeGraph;
    use crate::traits::TraitIndex;
    use crate::types::{Shape, ShapeKind};
    use indexmap::IndexMap;

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    #[test]
    fn case_insensitive_root_ids_conflict() {
        let graph = ShapeGraph::from_shapes([
            Shape::new(id("ns#Foo"), ShapeKind::String),
            Shape::new(id("ns#FOO"), ShapeKind::String),
            Shape::new(id("other#foo"), ShapeKind::String),
        ]);
        let model = Model::new(graph, TraitIndex::new(), IndexMap::new());
        let found = ShapeIdConflictValidator.validate(&model);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|v| v.kind == ViolationKind::ShapeConflict));
        assert!(found[0].message.contains("`ns#FOO`") || found[0].message.contains("`ns#Foo`"));
    }

    #[test]
    fn member_names_must_differ_by_more_than_case() {
        let graph = ShapeGraph::from_shapes([
            Shape::new(id("smithy.api#String"), ShapeKind::String),
            Shape::new(id("ns#S"), ShapeKind::Structure)
                .with_member("name", id("smithy.api#String"))
                .with_member("Name", id("smithy.api#String")),
        ]);
        let model = Model::new(graph, TraitIndex::new(), IndexMap::new());
        let found = ShapeIdConflictValidator.validate(&model);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shape_id, Some(id("ns#S")));
        assert!(found[0].message.contains("`name`, `Name`"));
    }
}
