//! Containment: the operations and resources reachable from a service or
//! resource through `operations`, `resources` and lifecycle bindings.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::graph::ShapeGraph;
use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::{Shape, ShapeType};

static EMPTY: BTreeSet<ShapeId> = BTreeSet::new();

#[derive(Debug, Default)]
pub struct TopDownIndex {
    operations: HashMap<ShapeId, BTreeSet<ShapeId>>,
    resources: HashMap<ShapeId, BTreeSet<ShapeId>>,
    parents: HashMap<ShapeId, Vec<ShapeId>>,
}

impl TopDownIndex {
    pub fn build(model: &Model) -> Self {
        let graph = model.graph();
        let mut index = TopDownIndex::default();

        for shape in graph.root_shapes() {
            let children: Vec<&ShapeId> = match (shape.as_service(), shape.as_resource()) {
                (Some(service), _) => service.resources.iter().collect(),
                (_, Some(resource)) => resource.resources.iter().collect(),
                _ => continue,
            };
            for child in children {
                index
                    .parents
                    .entry(child.clone())
                    .or_default()
                    .push(shape.id.clone());
            }

            let mut operations = BTreeSet::new();
            let mut resources = BTreeSet::new();
            let mut visited = HashSet::new();
            collect(graph, shape, &mut operations, &mut resources, &mut visited);
            index.operations.insert(shape.id.clone(), operations);
            index.resources.insert(shape.id.clone(), resources);
        }

        tracing::debug!(containers = index.operations.len(), "built top-down index");
        index
    }

    /// Operations bound to `id` directly or through nested resources.
    pub fn contained_operations(&self, id: &ShapeId) -> &BTreeSet<ShapeId> {
        self.operations.get(id).unwrap_or(&EMPTY)
    }

    /// Resources bound to `id` directly or through nested resources.
    pub fn contained_resources(&self, id: &ShapeId) -> &BTreeSet<ShapeId> {
        self.resources.get(id).unwrap_or(&EMPTY)
    }

    /// Services and resources that list `id` in their `resources`.
    pub fn parents_of(&self, id: &ShapeId) -> &[ShapeId] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Services whose closure contains the operation or resource `id`,
    /// sorted.
    pub fn containing_services<'a>(&'a self, model: &Model, id: &ShapeId) -> Vec<&'a ShapeId> {
        let mut out: Vec<&ShapeId> = self
            .operations
            .iter()
            .filter(|(container, _)| {
                model
                    .get_shape(container)
                    .is_some_and(|s| s.shape_type() == ShapeType::Service)
            })
            .filter(|(container, ops)| {
                ops.contains(id) || self.contained_resources(container).contains(id)
            })
            .map(|(container, _)| container)
            .collect();
        out.sort();
        out
    }
}

fn collect(
    graph: &ShapeGraph,
    shape: &Shape,
    operations: &mut BTreeSet<ShapeId>,
    resources: &mut BTreeSet<ShapeId>,
    visited: &mut HashSet<ShapeId>,
) {
    if !visited.insert(shape.id.clone()) {
        return;
    }
    let (ops, children): (Vec<&ShapeId>, &[ShapeId]) = match (shape.as_service(), shape.as_resource()) {
        (Some(service), _) => (service.operations.iter().collect(), service.resources.as_slice()),
        (_, Some(resource)) => (resource.all_operations(), resource.resources.as_slice()),
        _ => return,
    };
    operations.extend(ops.into_iter().cloned());
    for child in children {
        resources.insert(child.clone());
        if let Some(child_shape) = graph.get(child) {
            collect(graph, child_shape, operations, resources, visited);
        }
    }
}

/// A cycle in resource containment (`A` binds `B` binds ... binds `A`), as
/// the path from the first resource back to itself.
pub fn resource_cycle(graph: &ShapeGraph) -> Option<Vec<ShapeId>> {
    let mut done: HashSet<ShapeId> = HashSet::new();
    for shape in graph.root_shapes() {
        if shape.as_resource().is_none() || done.contains(&shape.id) {
            continue;
        }
        let mut path = Vec::new();
        if let Some(cycle) = visit(graph, &shape.id, &mut path, &mut done) {
            return Some(cycle);
        }
    }
    None
}

fn visit(
    graph: &ShapeGraph,
    id: &ShapeId,
    path: &mut Vec<ShapeId>,
    done: &mut HashSet<ShapeId>,
) -> Option<Vec<ShapeId>> {
    if let Some(start) = path.iter().position(|p| p == id) {
        let mut cycle = path[start..].to_vec();
        cycle.push(id.clone());
        return Some(cycle);
    }
    if done.contains(id) {
        return None;
    }
    let resource = graph.get(id)?.as_resource()?;
    path.push(id.clone());
    for child in &resource.resources {
        if let Some(cycle) = visit(graph, child, path, done) {
            return Some(cycle);
        }
    }
    path.pop();
    done.insert(id.clone());
    None
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TraitIndex;
    use crate::types::{ResourceData, ServiceData, ShapeKind};
    use indexmap::IndexMap;

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    fn resource(name: &str, read: Option<&str>, children: &[&str]) -> Shape {
        Shape::new(
            id(name),
            ShapeKind::Resource(ResourceData {
                read: read.map(id),
                resources: children.iter().map(|c| id(c)).collect(),
                ..Default::default()
            }),
        )
    }

    fn op(name: &str) -> Shape {
        Shape::new(id(name), ShapeKind::Operation(Default::default()))
    }

    fn model() -> Model {
        let graph = ShapeGraph::from_shapes([
            Shape::new(
                id("ns#Svc"),
                ShapeKind::Service(ServiceData {
                    version: "1".into(),
                    operations: vec![id("ns#Ping")],
                    resources: vec![id("ns#City")],
                    errors: vec![],
                }),
            ),
            resource("ns#City", Some("ns#GetCity"), &["ns#Forecast"]),
            resource("ns#Forecast", Some("ns#GetForecast"), &[]),
            op("ns#Ping"),
            op("ns#GetCity"),
            op("ns#GetForecast"),
            op("ns#Orphan"),
        ]);
        Model::new(graph, TraitIndex::new(), IndexMap::new())
    }

    #[test]
    fn service_contains_nested_operations_and_resources() {
        let m = model();
        let index = TopDownIndex::build(&m);
        let ops: Vec<String> = index
            .contained_operations(&id("ns#Svc"))
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(ops, vec!["GetCity", "GetForecast", "Ping"]);
        assert_eq!(index.contained_resources(&id("ns#Svc")).len(), 2);
        assert_eq!(index.contained_operations(&id("ns#Forecast")).len(), 1);
        assert!(index.contained_operations(&id("ns#Ping")).is_empty());
    }

    #[test]
    fn parents_and_containing_services() {
        let m = model();
        let index = TopDownIndex::build(&m);
        assert_eq!(index.parents_of(&id("ns#Forecast")), &[id("ns#City")]);
        assert_eq!(index.parents_of(&id("ns#City")), &[id("ns#Svc")]);
        assert_eq!(
            index.containing_services(&m, &id("ns#GetForecast")),
            vec![&id("ns#Svc")]
        );
        assert_eq!(
            index.containing_services(&m, &id("ns#Forecast")),
            vec![&id("ns#Svc")]
        );
        assert!(index.containing_services(&m, &id("ns#Orphan")).is_empty());
    }

    #[test]
    fn detects_resource_cycles() {
        let acyclic = ShapeGraph::from_shapes([
            resource("ns#A", None, &["ns#B"]),
            resource("ns#B", None, &[]),
        ]);
        assert!(resource_cycle(&acyclic).is_none());

        let cyclic = ShapeGraph::from_shapes([
            resource("ns#A", None, &["ns#B"]),
            resource("ns#B", None, &["ns#C"]),
            resource("ns#C", None, &["ns#A"]),
        ]);
        let cycle: Vec<String> = resource_cycle(&cyclic)
            .unwrap()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(cycle, vec!["A", "B", "C", "A"]);
    }
}
