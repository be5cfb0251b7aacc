//! Identifier bindings between resources and their operations.
//!
//! An operation bound to a resource binds an identifier when its input has a
//! required top-level member for it, either implicitly (same name and
//! target) or explicitly with `@resourceIdentifier("name")`.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::{ResourceData, Shape};

/// How an operation relates to the instances of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingType {
    /// Every identifier is bound.
    Instance,
    /// At least one of the resource's own identifiers is left unbound, and
    /// every identifier inherited from a parent is bound.
    Collection,
    /// Neither an instance nor a collection binding.
    Invalid,
    /// The operation is not bound to the resource.
    None,
}

#[derive(Debug, Default)]
pub struct IdentifierBindingIndex {
    bindings: HashMap<(ShapeId, ShapeId), IndexMap<String, String>>,
    types: HashMap<(ShapeId, ShapeId), BindingType>,
}

impl IdentifierBindingIndex {
    pub fn build(model: &Model) -> Self {
        let top_down = model.top_down();
        let mut index = IdentifierBindingIndex::default();

        for resource_shape in model.graph().root_shapes() {
            let Some(resource) = resource_shape.as_resource() else {
                continue;
            };
            let inherited: HashSet<&str> = top_down
                .parents_of(&resource_shape.id)
                .iter()
                .filter_map(|p| model.get_shape(p)?.as_resource())
                .flat_map(|parent| parent.identifiers.keys().map(String::as_str))
                .collect();

            for operation in resource.all_operations() {
                let bound = operation_bindings(model, resource, operation);
                let binding_type = classify(resource, operation, &bound, &inherited);
                let key = (resource_shape.id.clone(), operation.clone());
                index.types.insert(key.clone(), binding_type);
                index.bindings.insert(key, bound);
            }
        }

        index
    }

    /// The binding type of `operation` on `resource`; [`BindingType::None`]
    /// when it is not bound there.
    pub fn binding_type(&self, resource: &ShapeId, operation: &ShapeId) -> BindingType {
        self.types
            .get(&(resource.clone(), operation.clone()))
            .copied()
            .unwrap_or(BindingType::None)
    }

    /// Identifier name to the input member that binds it.
    pub fn bindings(&self, resource: &ShapeId, operation: &ShapeId) -> Option<&IndexMap<String, String>> {
        self.bindings.get(&(resource.clone(), operation.clone()))
    }
}

/// Identifier name to input member name, for every identifier `operation`
/// binds.
fn operation_bindings(model: &Model, resource: &ResourceData, operation: &ShapeId) -> IndexMap<String, String> {
    let mut bound = IndexMap::new();
    let Some(input) = model
        .get_shape(operation)
        .and_then(Shape::as_operation)
        .and_then(|op| op.input.as_ref())
        .and_then(|input| model.get_shape(input))
    else {
        return bound;
    };

    let traits = model.traits();
    let required: Vec<&Shape> = input
        .members
        .values()
        .filter(|m| traits.has_prelude(&m.id, "required"))
        .collect();

    for (name, target) in &resource.identifiers {
        let explicit = required.iter().find(|m| {
            traits
                .get_prelude(&m.id, "resourceIdentifier")
                .and_then(|v| v.as_str())
                == Some(name.as_str())
        });
        let implicit = || {
            required
                .iter()
                .find(|m| m.id.member() == Some(name.as_str()) && m.target() == Some(target))
        };
        if let Some(member) = explicit.or_else(implicit) {
            if let Some(member_name) = member.id.member() {
                bound.insert(name.clone(), member_name.to_string());
            }
        }
    }
    bound
}

fn classify(
    resource: &ResourceData,
    operation: &ShapeId,
    bound: &IndexMap<String, String>,
    inherited: &HashSet<&str>,
) -> BindingType {
    if resource.identifiers.is_empty() {
        return if declared_collection(resource, operation) {
            BindingType::Collection
        } else {
            BindingType::Instance
        };
    }
    if bound.len() == resource.identifiers.len() {
        return BindingType::Instance;
    }
    if inherited.iter().all(|name| bound.contains_key(*name)) {
        return BindingType::Collection;
    }
    BindingType::Invalid
}

/// Whether the resource binds `operation` where a collection binding is
/// expected: `list` and `collectionOperations`.
pub(crate) fn declared_collection(resource: &ResourceData, operation: &ShapeId) -> bool {
    resource.list.as_ref() == Some(operation) || resource.collection_operations.contains(operation)
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ShapeGraph;
    use crate::traits::TraitIndex;
    use crate::types::{OperationData, ShapeKind};
    use serde_json::json;

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    fn op(name: &str, input: Option<&str>) -> Shape {
        Shape::new(
            id(name),
            ShapeKind::Operation(OperationData {
                input: input.map(id),
                ..Default::default()
            }),
        )
    }

    fn model() -> Model {
        let mut city = ResourceData {
            read: Some(id("ns#GetCity")),
            list: Some(id("ns#ListCities")),
            resources: vec![id("ns#Forecast")],
            ..Default::default()
        };
        city.identifiers.insert("cityId".into(), id("ns#CityId"));
        let mut forecast = ResourceData {
            read: Some(id("ns#GetForecast")),
            list: Some(id("ns#ListForecasts")),
            operations: vec![id("ns#Broken")],
            ..Default::default()
        };
        forecast.identifiers.insert("cityId".into(), id("ns#CityId"));
        forecast.identifiers.insert("forecastId".into(), id("ns#CityId"));

        let graph = ShapeGraph::from_shapes([
            Shape::new(id("ns#CityId"), ShapeKind::String),
            Shape::new(id("ns#City"), ShapeKind::Resource(city)),
            Shape::new(id("ns#Forecast"), ShapeKind::Resource(forecast)),
            op("ns#GetCity", Some("ns#GetCityInput")),
            op("ns#ListCities", None),
            op("ns#GetForecast", Some("ns#GetForecastInput")),
            op("ns#ListForecasts", Some("ns#GetCityInput")),
            op("ns#Broken", Some("ns#BrokenInput")),
            Shape::new(id("ns#GetCityInput"), ShapeKind::Structure).with_member("cityId", id("ns#CityId")),
            Shape::new(id("ns#GetForecastInput"), ShapeKind::Structure)
                .with_member("cityId", id("ns#CityId"))
                .with_member("theForecast", id("ns#CityId")),
            Shape::new(id("ns#BrokenInput"), ShapeKind::Structure)
                .with_member("forecastId", id("ns#CityId")),
        ]);

        let mut traits = TraitIndex::new();
        for member in [
            "ns#GetCityInput$cityId",
            "ns#GetForecastInput$cityId",
            "ns#GetForecastInput$theForecast",
            "ns#BrokenInput$forecastId",
        ] {
            traits.apply(&id(member), &id("smithy.api#required"), json!({})).unwrap();
        }
        traits
            .apply(
                &id("ns#GetForecastInput$theForecast"),
                &id("smithy.api#resourceIdentifier"),
                json!("forecastId"),
            )
            .unwrap();
        Model::new(graph, traits, IndexMap::new())
    }

    #[test]
    fn implicit_and_explicit_bindings() {
        let m = model();
        let index = m.identifier_bindings();
        let forecast = id("ns#Forecast");
        let get = id("ns#GetForecast");
        assert_eq!(index.binding_type(&forecast, &get), BindingType::Instance);
        let bindings = index.bindings(&forecast, &get).unwrap();
        assert_eq!(bindings["cityId"], "cityId");
        assert_eq!(bindings["forecastId"], "theForecast");
    }

    #[test]
    fn collection_binding_keeps_parent_identifiers() {
        let m = model();
        let index = m.identifier_bindings();
        assert_eq!(
            index.binding_type(&id("ns#Forecast"), &id("ns#ListForecasts")),
            BindingType::Collection
        );
        assert_eq!(
            index.binding_type(&id("ns#City"), &id("ns#ListCities")),
            BindingType::Collection
        );
        assert_eq!(
            index.binding_type(&id("ns#City"), &id("ns#GetCity")),
            BindingType::Instance
        );
    }

    #[test]
    fn missing_parent_identifier_is_invalid() {
        let m = model();
        let index = m.identifier_bindings();
        assert_eq!(
            index.binding_type(&id("ns#Forecast"), &id("ns#Broken")),
            BindingType::Invalid
        );
        assert_eq!(
            index.binding_type(&id("ns#City"), &id("ns#GetForecast")),
            BindingType::None
        );
    }
}
