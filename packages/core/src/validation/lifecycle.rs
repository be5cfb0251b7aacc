//! Lifecycle operations must have the semantics their slot implies.
//!
//! | Slot | Binding | `@readonly` | Idempotent |
//! |------|---------|-------------|------------|
//! | put | instance | no | yes |
//! | create | any | no | yes, when bound as instance |
//! | read | instance | yes | |
//! | update | instance | no | |
//! | delete | instance | no | yes |
//! | list | collection | yes | |
//!
//! `@readonly` operations count as idempotent.

use crate::knowledge::BindingType;
use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::Shape;
use crate::validation::resource::binding_message;
use crate::validation::{Validator, Violation, ViolationKind};

pub struct ResourceLifecycleValidator;

impl Validator for ResourceLifecycleValidator {
    fn name(&self) -> &'static str {
        "ResourceLifecycle"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();
        for shape in model.graph().root_shapes() {
            let Some(resource) = shape.as_resource() else {
                continue;
            };
            let check = Check { model, resource: shape };

            if let Some(op) = check.operation(&resource.put) {
                violations.extend(check.instance(op, "put"));
                violations.extend(check.readonly(op, "put", false));
                violations.extend(check.idempotent(op, "put"));
            }
            if let Some(op) = check.operation(&resource.create) {
                violations.extend(check.readonly(op, "create", false));
                if check.binding(op) == BindingType::Instance {
                    violations.extend(check.idempotent(op, "create"));
                }
            }
            if let Some(op) = check.operation(&resource.read) {
                violations.extend(check.instance(op, "read"));
                violations.extend(check.readonly(op, "read", true));
            }
            if let Some(op) = check.operation(&resource.update) {
                violations.extend(check.instance(op, "update"));
                violations.extend(check.readonly(op, "update", false));
            }
            if let Some(op) = check.operation(&resource.delete) {
                violations.extend(check.instance(op, "delete"));
                violations.extend(check.readonly(op, "delete", false));
                violations.extend(check.idempotent(op, "delete"));
            }
            if let Some(op) = check.operation(&resource.list) {
                violations.extend(check.collection(op, "list"));
                violations.extend(check.readonly(op, "list", true));
            }
        }
        violations
    }
}

struct Check<'m> {
    model: &'m Model,
    resource: &'m Shape,
}

impl<'m> Check<'m> {
    /// The lifecycle operation, when it resolves to an operation shape.
    /// Dangling targets are reported by the target rule.
    fn operation(&self, slot: &'m Option<ShapeId>) -> Option<&'m ShapeId> {
        let id = slot.as_ref()?;
        self.model.get_shape(id)?.as_operation()?;
        Some(id)
    }

    fn binding(&self, op: &ShapeId) -> BindingType {
        self.model.identifier_bindings().binding_type(&self.resource.id, op)
    }

    fn violation(&self, message: String) -> Violation {
        Violation::error(ViolationKind::ResourceLifecycle, &self.resource.id, message)
    }

    /// Invalid bindings are left to the identifier rule.
    fn instance(&self, op: &ShapeId, lifecycle: &str) -> Option<Violation> {
        if self.binding(op) != BindingType::Collection {
            return None;
        }
        let resource = self.resource.as_resource()?;
        let found = self
            .model
            .identifier_bindings()
            .bindings(&self.resource.id, op)
            .map(binding_message)
            .unwrap_or_default();
        Some(self.violation(format!(
            "The `{}` operation bound to this resource as the `{}` lifecycle operation does not form a valid instance operation. This means that all of the identifiers of the resource were not implicitly or explicitly bound to the input of the operation. Expected the following identifier bindings: [{}]. Found the following identifier bindings: [{}]",
            op,
            lifecycle,
            binding_message(&resource.identifiers),
            found
        )))
    }

    fn collection(&self, op: &ShapeId, lifecycle: &str) -> Option<Violation> {
        if self.binding(op) != BindingType::Instance {
            return None;
        }
        let found = self
            .model
            .identifier_bindings()
            .bindings(&self.resource.id, op)
            .map(binding_message)
            .unwrap_or_default();
        Some(self.violation(format!(
            "The `{}` operation bound to this resource as the {} lifecycle operation does not form a valid collection operation because all of the identifiers of the resource were bound to the input: [{}]",
            op, lifecycle, found
        )))
    }

    fn readonly(&self, op: &ShapeId, lifecycle: &str, required: bool) -> Option<Violation> {
        if self.model.traits().has_prelude(op, "readonly") == required {
            return None;
        }
        Some(self.violation(format!(
            "The `{}` lifecycle operation of this resource targets an invalid operation, `{}`. The targeted operation {} be marked with the readonly trait.",
            lifecycle,
            op,
            if required { "must" } else { "must not" }
        )))
    }

    fn idempotent(&self, op: &ShapeId, lifecycle: &str) -> Option<Violation> {
        let traits = self.model.traits();
        if traits.has_prelude(op, "idempotent") || traits.has_prelude(op, "readonly") {
            return None;
        }
        Some(self.violation(format!(
            "The `{}` lifecycle operation of this resource targets an invalid operation, `{}`. The targeted operation must be marked as idempotent.",
            lifecycle, op
        )))
    }
}

// --- tests -------------------------------------------------------------------
