//! Typed edges between shapes.
//!
//! Every edge is directed from the shape that declares it to the shape it
//! names. Reverse lookups go through [`NeighborIndex`], which the model
//! builds once after assembly.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::ShapeGraph;
use crate::shape_id::ShapeId;
use crate::traits::TraitIndex;
use crate::types::{Shape, ShapeKind};

/// The kind of edge between two shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipType {
    /// service or resource to a child resource.
    Resource,
    /// service or resource to a bound operation (lifecycle operations included).
    Operation,
    /// resource to an operation in `collectionOperations`.
    CollectionOperation,
    Create,
    Put,
    Read,
    Update,
    Delete,
    List,
    /// resource to the shape an identifier targets.
    Identifier,
    /// aggregate to one of its members.
    Member,
    /// member to its target.
    MemberTarget,
    Input,
    Output,
    /// service or operation to an error structure.
    Error,
    /// shape to the definition of a trait applied to it.
    Trait,
}

impl RelationshipType {
    /// The label used by directed selectors (`-[input]->`). Member targets
    /// have no label.
    pub fn selector_label(self) -> Option<&'static str> {
        Some(match self {
            RelationshipType::Resource => "resource",
            RelationshipType::Operation => "operation",
            RelationshipType::CollectionOperation => "collectionOperation",
            RelationshipType::Create => "create",
            RelationshipType::Put => "put",
            RelationshipType::Read => "read",
            RelationshipType::Update => "update",
            RelationshipType::Delete => "delete",
            RelationshipType::List => "list",
            RelationshipType::Identifier => "identifier",
            RelationshipType::Member => "member",
            RelationshipType::Input => "input",
            RelationshipType::Output => "output",
            RelationshipType::Error => "error",
            RelationshipType::Trait => "trait",
            RelationshipType::MemberTarget => return None,
        })
    }

    /// Whether this edge binds an operation to a resource as an instance
    /// operation.
    pub fn is_instance_binding(self) -> bool {
        matches!(
            self,
            RelationshipType::Operation
                | RelationshipType::Put
                | RelationshipType::Read
                | RelationshipType::Update
                | RelationshipType::Delete
        )
    }

    /// Whether this edge binds an operation to a resource as a collection
    /// operation.
    pub fn is_collection_binding(self) -> bool {
        matches!(
            self,
            RelationshipType::CollectionOperation | RelationshipType::Create | RelationshipType::List
        )
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selector_label() {
            Some(label) => f.write_str(label),
            None => f.write_str("memberTarget"),
        }
    }
}

/// A directed edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub shape: ShapeId,
    pub rel: RelationshipType,
    pub neighbor: ShapeId,
}

/// The structural edges a shape declares (traits excluded).
pub fn relationships_of(shape: &Shape) -> Vec<Relationship> {
    let mut out = Vec::new();
    let mut push = |rel: RelationshipType, neighbor: &ShapeId| {
        out.push(Relationship {
            shape: shape.id.clone(),
            rel,
            neighbor: neighbor.clone(),
        });
    };

    for member in shape.members.values() {
        push(RelationshipType::Member, &member.id);
    }

    match &shape.kind {
        ShapeKind::Member { target } => push(RelationshipType::MemberTarget, target),
        ShapeKind::Service(service) => {
            for id in &service.operations {
                push(RelationshipType::Operation, id);
            }
            for id in &service.resources {
                push(RelationshipType::Resource, id);
            }
            for id in &service.errors {
                push(RelationshipType::Error, id);
            }
        }
        ShapeKind::Resource(resource) => {
            for target in resource.identifiers.values() {
                push(RelationshipType::Identifier, target);
            }
            let lifecycle = [
                (RelationshipType::Create, &resource.create),
                (RelationshipType::Put, &resource.put),
                (RelationshipType::Read, &resource.read),
                (RelationshipType::Update, &resource.update),
                (RelationshipType::Delete, &resource.delete),
                (RelationshipType::List, &resource.list),
            ];
            for (rel, id) in lifecycle {
                if let Some(id) = id {
                    push(rel, id);
                }
            }
            for id in resource.all_operations() {
                push(RelationshipType::Operation, id);
            }
            for id in &resource.collection_operations {
                push(RelationshipType::CollectionOperation, id);
            }
            for id in &resource.resources {
                push(RelationshipType::Resource, id);
            }
        }
        ShapeKind::Operation(operation) => {
            if let Some(id) = &operation.input {
                push(RelationshipType::Input, id);
            }
            if let Some(id) = &operation.output {
                push(RelationshipType::Output, id);
            }
            for id in &operation.errors {
                push(RelationshipType::Error, id);
            }
        }
        _ => {}
    }
    out
}

/// Forward and reverse edges of every shape, trait edges included.
///
/// Edges whose neighbor is absent from the graph are kept in the forward
/// table so target validation can report them.
#[derive(Debug, Default)]
pub struct NeighborIndex {
    forward: HashMap<ShapeId, Vec<Relationship>>,
    reverse: HashMap<ShapeId, Vec<Relationship>>,
}

impl NeighborIndex {
    pub fn build(graph: &ShapeGraph, traits: &TraitIndex) -> Self {
        let mut forward: HashMap<ShapeId, Vec<Relationship>> = HashMap::new();
        let mut reverse: HashMap<ShapeId, Vec<Relationship>> = HashMap::new();

        for shape in graph.all_shapes() {
            let mut rels = graph.neighbors(&shape.id);
            for trait_id in traits.applied_traits(&shape.id).keys() {
                rels.push(Relationship {
                    shape: shape.id.clone(),
                    rel: RelationshipType::Trait,
                    neighbor: trait_id.clone(),
                });
            }
            for rel in &rels {
                reverse
                    .entry(rel.neighbor.clone())
                    .or_default()
                    .push(rel.clone());
            }
            forward.insert(shape.id.clone(), rels);
        }

        Self { forward, reverse }
    }

    /// Edges declared by `id`.
    pub fn forward(&self, id: &ShapeId) -> &[Relationship] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges pointing at `id`.
    pub fn reverse(&self, id: &ShapeId) -> &[Relationship] {
        self.reverse.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every forward edge in the model.
    pub fn all(&self) -> impl Iterator<Item = &Relationship> {
        self.forward.values().flatten()
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperationData, ResourceData};

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    #[test]
    fn lifecycle_operations_also_get_operation_edges() {
        let resource = Shape::new(
            id("ns#R"),
            ShapeKind::Resource(ResourceData {
                read: Some(id("ns#GetR")),
                list: Some(id("ns#ListR")),
                ..Default::default()
            }),
        );
        let rels = relationships_of(&resource);
        let has = |rel, n: &str| rels.iter().any(|r| r.rel == rel && r.neighbor == id(n));
        assert!(has(RelationshipType::Read, "ns#GetR"));
        assert!(has(RelationshipType::Operation, "ns#GetR"));
        assert!(has(RelationshipType::List, "ns#ListR"));
        assert!(has(RelationshipType::Operation, "ns#ListR"));
    }

    #[test]
    fn operation_edges() {
        let op = Shape::new(
            id("ns#Op"),
            ShapeKind::Operation(OperationData {
                input: Some(id("ns#In")),
                output: None,
                errors: vec![id("ns#Oops")],
            }),
        );
        let labels: Vec<&str> = relationships_of(&op)
            .iter()
            .filter_map(|r| r.rel.selector_label())
            .collect();
        assert_eq!(labels, vec!["input", "error"]);
    }

    #[test]
    fn members_have_unlabelled_target_edges() {
        let s = Shape::new(id("ns#S"), ShapeKind::Structure).with_member("a", id("ns#T"));
        let member_rels = relationships_of(&s.members["a"]);
        assert_eq!(member_rels.len(), 1);
        assert_eq!(member_rels[0].rel, RelationshipType::MemberTarget);
        assert_eq!(member_rels[0].rel.selector_label(), None);
    }

    #[test]
    fn binding_classification() {
        assert!(RelationshipType::Read.is_instance_binding());
        assert!(RelationshipType::Create.is_collection_binding());
        assert!(!RelationshipType::Create.is_instance_binding());
        assert!(!RelationshipType::Input.is_collection_binding());
    }
}
