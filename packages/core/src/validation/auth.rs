//! `@auth` may only name schemes the service actually applies.

use crate::knowledge::auth::auth_trait;
use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::ShapeType;
use crate::validation::{Validator, Violation, ViolationKind};

pub struct AuthTraitValidator;

impl Validator for AuthTraitValidator {
    fn name(&self) -> &'static str {
        "AuthTrait"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let index = model.auth();
        let mut violations = Vec::new();

        for service in model.shapes_of_type(ShapeType::Service) {
            let Some(listed) = auth_trait(model, &service.id) else {
                continue;
            };
            let missing = unapplied(&listed, index.service_schemes(&service.id));
            if !missing.is_empty() {
                violations.push(Violation::error(
                    ViolationKind::AuthTrait,
                    &service.id,
                    format!(
                        "auth trait is configured to use auth schemes that are not applied to the service: [{}]",
                        missing
                    ),
                ));
            }
        }

        for operation in model.shapes_of_type(ShapeType::Operation) {
            let Some(listed) = auth_trait(model, &operation.id) else {
                continue;
            };
            for service in model.top_down().containing_services(model, &operation.id) {
                let missing = unapplied(&listed, index.service_schemes(service));
                if !missing.is_empty() {
                    violations.push(Violation::error(
                        ViolationKind::AuthTrait,
                        &operation.id,
                        format!(
                            "auth trait is configured to use auth schemes that are not applied to the `{}` service: [{}]",
                            service, missing
                        ),
                    ));
                }
            }
        }

        violations
    }
}

/// Ticked list of `listed` schemes absent from `applied`, empty when all
/// are present.
fn unapplied(listed: &[ShapeId], applied: &[ShapeId]) -> String {
    listed
        .iter()
        .filter(|scheme| !applied.contains(scheme))
        .map(|scheme| format!("`{}`", scheme))
        .collect::<Vec<_>>()
        .join(", ")
}

// --- tests -------------------------------------------------------------------
