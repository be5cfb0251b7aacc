//! The assembled, immutable model.

use indexmap::IndexMap;
use serde_json::Value;

use crate::graph::ShapeGraph;
use crate::knowledge::{
    AuthIndex, ConditionKeysIndex, IdentifierBindingIndex, KnowledgeCache, PaginationIndex,
    TopDownIndex,
};
use crate::relationship::NeighborIndex;
use crate::shape_id::ShapeId;
use crate::traits::TraitIndex;
use crate::types::{Shape, ShapeType};

/// A merged model: shapes, applied traits, metadata, and the indexes
/// derived from them.
///
/// A `Model` never changes after [`Model::new`]. Knowledge indexes are built
/// on first use and cached for the lifetime of the model, so validators
/// running in parallel share one copy.
#[derive(Debug)]
pub struct Model {
    graph: ShapeGraph,
    traits: TraitIndex,
    metadata: IndexMap<String, Value>,
    neighbors: NeighborIndex,
    knowledge: KnowledgeCache,
}

impl Model {
    pub fn new(graph: ShapeGraph, traits: TraitIndex, metadata: IndexMap<String, Value>) -> Self {
        let neighbors = NeighborIndex::build(&graph, &traits);
        Self {
            graph,
            traits,
            metadata,
            neighbors,
            knowledge: KnowledgeCache::default(),
        }
    }

    pub fn graph(&self) -> &ShapeGraph {
        &self.graph
    }

    pub fn traits(&self) -> &TraitIndex {
        &self.traits
    }

    pub fn metadata(&self) -> &IndexMap<String, Value> {
        &self.metadata
    }

    /// Forward and reverse edges, trait edges included.
    pub fn neighbors(&self) -> &NeighborIndex {
        &self.neighbors
    }

    pub fn get_shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.graph.get(id)
    }

    /// Every shape, members included.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.graph.all_shapes()
    }

    pub fn shapes_of_type(&self, shape_type: ShapeType) -> impl Iterator<Item = &Shape> {
        self.graph.shapes_of_type(shape_type)
    }

    /// Whether `id` carries `smithy.api#trait`.
    pub fn is_trait_definition(&self, id: &ShapeId) -> bool {
        self.traits.has_prelude(id, "trait")
    }

    /// The shape a member targets, or the shape itself for non-members.
    pub fn resolve_target(&self, id: &ShapeId) -> Option<&Shape> {
        let shape = self.graph.get(id)?;
        match shape.target() {
            Some(target) => self.graph.get(target),
            None => Some(shape),
        }
    }

    /// The value of `trait_id` on a member, falling back to the member's
    /// target.
    pub fn member_trait(&self, member: &ShapeId, trait_id: &ShapeId) -> Option<&Value> {
        self.traits.get(member, trait_id).or_else(|| {
            let target = self.graph.get(member)?.target()?;
            self.traits.get(target, trait_id)
        })
    }

    // --- knowledge -------------------------------------------------------

    pub fn top_down(&self) -> &TopDownIndex {
        self.knowledge
            .top_down
            .get_or_init(|| TopDownIndex::build(self))
    }

    pub fn identifier_bindings(&self) -> &IdentifierBindingIndex {
        self.knowledge
            .identifiers
            .get_or_init(|| IdentifierBindingIndex::build(self))
    }

    pub fn condition_keys(&self) -> &ConditionKeysIndex {
        self.knowledge
            .condition_keys
            .get_or_init(|| ConditionKeysIndex::build(self))
    }

    pub fn auth(&self) -> &AuthIndex {
        self.knowledge.auth.get_or_init(|| AuthIndex::build(self))
    }

    pub fn pagination(&self) -> &PaginationIndex {
        self.knowledge
            .pagination
            .get_or_init(|| PaginationIndex::build(self))
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShapeKind;
    use serde_json::json;

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    fn model() -> Model {
        let graph = ShapeGraph::from_shapes([
            Shape::new(id("smithy.api#String"), ShapeKind::String),
            Shape::new(id("ns#Name"), ShapeKind::String),
            Shape::new(id("ns#S"), ShapeKind::Structure)
                .with_member("a", id("ns#Name"))
                .with_member("b", id("ns#Missing")),
        ]);
        let mut traits = TraitIndex::new();
        traits
            .apply(&id("ns#Name"), &id("smithy.api#pattern"), json!("^[a-z]+$"))
            .unwrap();
        traits
            .apply(&id("ns#Name"), &id("smithy.api#trait"), json!({}))
            .unwrap();
        Model::new(graph, traits, IndexMap::new())
    }

    #[test]
    fn accessors() {
        let m = model();
        assert_eq!(m.shapes().count(), 5);
        assert!(m.get_shape(&id("ns#S$a")).is_some());
        assert!(m.is_trait_definition(&id("ns#Name")));
        assert!(!m.is_trait_definition(&id("ns#S")));
        assert_eq!(m.shapes_of_type(ShapeType::Member).count(), 2);
    }

    #[test]
    fn resolves_member_targets_and_inherited_traits() {
        let m = model();
        assert_eq!(m.resolve_target(&id("ns#S$a")).unwrap().id, id("ns#Name"));
        assert_eq!(m.resolve_target(&id("ns#S")).unwrap().id, id("ns#S"));
        assert!(m.resolve_target(&id("ns#S$b")).is_none());
        assert_eq!(
            m.member_trait(&id("ns#S$a"), &id("smithy.api#pattern")),
            Some(&json!("^[a-z]+$"))
        );
        assert_eq!(m.member_trait(&id("ns#S$b"), &id("smithy.api#pattern")), None);
    }

    #[test]
    fn neighbor_index_includes_trait_edges() {
        let m = model();
        let traits: Vec<String> = m
            .neighbors()
            .forward(&id("ns#Name"))
            .iter()
            .map(|r| r.neighbor.to_string())
            .collect();
        assert_eq!(traits, vec!["smithy.api#pattern", "smithy.api#trait"]);
    }
}
