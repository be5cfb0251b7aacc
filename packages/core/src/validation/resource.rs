//! Resource identifiers and how operations bind them.

use std::fmt::Display;

use indexmap::IndexMap;

use crate::knowledge::BindingType;
use crate::knowledge::identifiers::declared_collection;
use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::{ResourceData, Shape};
use crate::validation::{Validator, Violation, ViolationKind};

pub struct ResourceIdentifierValidator;

impl Validator for ResourceIdentifierValidator {
    fn name(&self) -> &'static str {
        "ResourceIdentifiers"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();
        for shape in model.graph().root_shapes() {
            let Some(resource) = shape.as_resource() else {
                continue;
            };
            check_children(model, shape, resource, &mut violations);
            check_bindings(model, shape, resource, &mut violations);
        }
        violations
    }
}

/// Children carry every parent identifier with the same target, and their
/// operations bind those identifiers.
fn check_children(model: &Model, parent: &Shape, resource: &ResourceData, violations: &mut Vec<Violation>) {
    let index = model.identifier_bindings();
    for child_id in &resource.resources {
        let Some(child) = model.get_shape(child_id).and_then(Shape::as_resource) else {
            continue;
        };

        for (name, target) in &resource.identifiers {
            match child.identifiers.get(name) {
                None => violations.push(Violation::error(
                    ViolationKind::IdentifierBinding,
                    child_id,
                    format!(
                        "This resource is bound as a child of `{}`, but it does not define the `{}` identifier of its parent",
                        parent.id, name
                    ),
                )),
                Some(child_target) if child_target != target => violations.push(Violation::error(
                    ViolationKind::IdentifierBinding,
                    child_id,
                    format!(
                        "The `{}` identifier of this resource targets `{}`, but it targets `{}` in its parent resource `{}`",
                        name, child_target, target, parent.id
                    ),
                )),
                Some(_) => {}
            }
        }

        for operation in child.all_operations() {
            let Some(bound) = index.bindings(child_id, operation) else {
                continue;
            };
            let mut missing: Vec<String> = resource
                .identifiers
                .keys()
                .filter(|name| !bound.contains_key(*name))
                .map(|name| format!("`{}`", name))
                .collect();
            if missing.is_empty() {
                continue;
            }
            missing.sort();
            violations.push(Violation::error(
                ViolationKind::IdentifierBinding,
                operation,
                format!(
                    "This operation is bound to the `{}` resource, which is a child of the `{}` resource, and it is missing the following resource identifier bindings of `{}`: [{}]",
                    child_id,
                    parent.id,
                    parent.id,
                    missing.join(", ")
                ),
            ));
        }
    }
}

/// Non-lifecycle operations use the binding their declaration asks for, and
/// no bound operation is left with an invalid binding.
fn check_bindings(model: &Model, shape: &Shape, resource: &ResourceData, violations: &mut Vec<Violation>) {
    let index = model.identifier_bindings();
    for operation in resource.all_operations() {
        let binding = index.binding_type(&shape.id, operation);
        let collection = declared_collection(resource, operation)
            || model.traits().has_prelude(operation, "collection");
        let lifecycle = is_lifecycle(resource, operation);
        let empty = IndexMap::new();
        let found = index.bindings(&shape.id, operation).unwrap_or(&empty);

        let message = match binding {
            BindingType::Instance if collection && !lifecycle => format!(
                "This operation is bound to the `{}` resource as a collection operation, but all of the identifiers of the resource are bound to members of the operation input: [{}]",
                shape.id,
                binding_message(found)
            ),
            BindingType::Collection if !collection && !lifecycle => instance_message(shape, resource, found),
            BindingType::Invalid if collection => format!(
                "This operation does not form a valid collection operation when bound to resource `{}`. Every identifier the resource inherits from its parents must be bound. Found the following identifier bindings: [{}]",
                shape.id,
                binding_message(found)
            ),
            BindingType::Invalid => instance_message(shape, resource, found),
            _ => continue,
        };
        violations.push(Violation::error(ViolationKind::IdentifierBinding, operation, message));
    }
}

fn instance_message(shape: &Shape, resource: &ResourceData, found: &IndexMap<String, String>) -> String {
    format!(
        "This operation does not form a valid instance operation when bound to resource `{}`. All of the identifiers of the resource were not implicitly or explicitly bound to the input of the operation. Expected the following identifier bindings: [{}]. Found the following identifier bindings: [{}]",
        shape.id,
        binding_message(&resource.identifiers),
        binding_message(found)
    )
}

fn is_lifecycle(resource: &ResourceData, operation: &ShapeId) -> bool {
    [
        &resource.create,
        &resource.put,
        &resource.read,
        &resource.update,
        &resource.delete,
        &resource.list,
    ]
    .into_iter()
    .any(|op| op.as_ref() == Some(operation))
}

/// `required member named `a` that targets `b`` for each entry, sorted.
pub(crate) fn binding_message<V: Display>(bindings: &IndexMap<String, V>) -> String {
    let mut entries: Vec<String> = bindings
        .iter()
        .map(|(name, target)| format!("required member named `{}` that targets `{}`", name, target))
        .collect();
    entries.sort();
    entries.join(", ")
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
        ResourceIdentifierValidator.validate(&model)
    }

    fn city_shapes() -> serde_json::Value {
        json!({
            "CityId": {"type": "string"},
            "ForecastId": {"type": "string"},
            "City": {"type": "resource", "identifiers": {"cityId": "CityId"},
                     "read": "GetCity", "resources": ["Forecast"]},
            "GetCity": {"type": "operation", "input": "GetCityInput", "traits": {"readonly": {}}},
            "GetCityInput": {"type": "structure", "members": {
                "cityId": {"target": "CityId", "traits": {"required": {}}}
            }}
        })
    }

    fn with(mut base: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
        let map = base.as_object_mut().unwrap();
        for (k, v) in extra.as_object().unwrap() {
            map.insert(k.clone(), v.clone());
        }
        base
    }

    #[test]
    fn well_formed_hierarchy_has_no_violations() {
        let found = violations(with(city_shapes(), json!({
            "Forecast": {"type": "resource",
                         "identifiers": {"cityId": "CityId", "forecastId": "ForecastId"},
                         "collectionOperations": ["ListForecasts"]},
            "ListForecasts": {"type": "operation", "input": "GetCityInput", "traits": {"readonly": {}}}
        })));
        assert!(found.is_empty(), "{found:#?}");
    }

    #[test]
    fn child_must_repeat_parent_identifiers() {
        let found = violations(with(city_shapes(), json!({
            "Forecast": {"type": "resource", "identifiers": {"forecastId": "ForecastId"}}
        })));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shape_id, Some("ns#Forecast".parse().unwrap()));
        assert!(found[0].message.contains("does not define the `cityId` identifier"));

        let found = violations(with(city_shapes(), json!({
            "Forecast": {"type": "resource", "identifiers": {"cityId": "ForecastId"}}
        })));
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("targets `ns#ForecastId`, but it targets `ns#CityId`"));
    }

    #[test]
    fn child_operations_must_bind_parent_identifiers() {
        let found = violations(with(city_shapes(), json!({
            "Forecast": {"type": "resource",
                         "identifiers": {"cityId": "CityId", "forecastId": "ForecastId"},
                         "operations": ["Orphan"]},
            "Orphan": {"type": "operation", "input": "OrphanInput"},
            "OrphanInput": {"type": "structure", "members": {
                "forecastId": {"target": "ForecastId", "traits": {"required": {}}}
            }}
        })));
        let messages: Vec<&str> = found.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(found.len(), 2, "{messages:#?}");
        assert!(found.iter().all(|v| v.shape_id == Some("ns#Orphan".parse().unwrap())));
        assert!(messages.iter().any(|m| m.ends_with("bindings of `ns#City`: [`cityId`]")));
        assert!(messages
            .iter()
            .any(|m| m.starts_with("This operation does not form a valid instance operation")));
    }

    #[test]
    fn collection_trait_requires_collection_binding() {
        let found = violations(with(city_shapes(), json!({
            "Forecast": {"type": "resource",
                         "identifiers": {"cityId": "CityId", "forecastId": "ForecastId"},
                         "operations": ["ListAll"]},
            "ListAll": {"type": "operation", "input": "ListAllInput", "traits": {"collection": {}}},
            "ListAllInput": {"type": "structure", "members": {
                "cityId": {"target": "CityId", "traits": {"required": {}}},
                "forecastId": {"target": "ForecastId", "traits": {"required": {}}}
            }}
        })));
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("as a collection operation, but all of the identifiers"));
    }
}
