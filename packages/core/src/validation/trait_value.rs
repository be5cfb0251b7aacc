//! Applied trait values must satisfy the trait's shape.

use crate::model::Model;
use crate::node_validation::NodeValidator;
use crate::shape_id::ShapeId;
use crate::validation::{Validator, Violation, ViolationKind};

pub struct TraitValueValidator;

impl Validator for TraitValueValidator {
    fn name(&self) -> &'static str {
        "TraitValue"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let node = NodeValidator::new(model);
        let mut shapes: Vec<&ShapeId> = model.traits().shapes().collect();
        shapes.sort();

        let mut violations = Vec::new();
        for shape in shapes {
            for (trait_id, value) in model.traits().applied_traits(shape) {
                // Unknown traits are reported during assembly.
                if model.get_shape(trait_id).is_none() {
                    continue;
                }
                for issue in node.validate(trait_id, value) {
                    violations.push(Violation::new(
                        ViolationKind::NodeValueType,
                        issue.severity,
                        Some(shape.clone()),
                        format!(
                            "Error validating trait `{}`{}: {}",
                            trait_name(trait_id),
                            issue.path,
                            issue.message
                        ),
                    ));
                }
            }
        }
        violations
    }
}

/// Prelude traits are named without their namespace.
fn trait_name(id: &ShapeId) -> String {
    if id.is_prelude() {
        id.name().to_string()
    } else {
        id.to_string()
    }
}

// --- tests -------------------------------------------------------------------
