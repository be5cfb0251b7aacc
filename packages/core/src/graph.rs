use indexmap::IndexMap;

use crate::relationship::{relationships_of, Relationship};
use crate::shape_id::ShapeId;
use crate::types::{Shape, ShapeType};

/// The arena of shapes that make up a model, keyed by [`ShapeId`].
///
/// Root shapes are stored directly; members live inside their container and
/// are resolved through it, so `get("ns#S$m")` works without a second table.
///
/// A second [`insert`](ShapeGraph::insert) for an ID that is already present
/// does not replace the stored shape. The duplicate is parked until the
/// assembler takes it with [`take_duplicates`](ShapeGraph::take_duplicates)
/// and reconciles the two definitions.
#[derive(Debug, Default, Clone)]
pub struct ShapeGraph {
    shapes: IndexMap<ShapeId, Shape>,
    duplicates: Vec<Shape>,
}

impl ShapeGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an iterator of root shapes.
    pub fn from_shapes(iter: impl IntoIterator<Item = Shape>) -> Self {
        let mut g = Self::new();
        for s in iter {
            g.insert(s);
        }
        g
    }

    /// Insert a root shape. Duplicates are deferred, see the type docs.
    pub fn insert(&mut self, shape: Shape) {
        if self.shapes.contains_key(&shape.id) {
            self.duplicates.push(shape);
        } else {
            self.shapes.insert(shape.id.clone(), shape);
        }
    }

    /// Drain the definitions that collided with an existing ID.
    pub fn take_duplicates(&mut self) -> Vec<Shape> {
        std::mem::take(&mut self.duplicates)
    }

    /// Look up a root or member shape. Never fails; absent IDs are `None`.
    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        match id.member() {
            None => self.shapes.get(id),
            Some(member) => self
                .shapes
                .get(&id.without_member())
                .and_then(|container| container.members.get(member)),
        }
    }

    pub fn contains(&self, id: &ShapeId) -> bool {
        self.get(id).is_some()
    }

    /// The members of `id` in declaration order. Empty for non-aggregates
    /// and unknown IDs.
    pub fn members_of(&self, id: &ShapeId) -> impl Iterator<Item = &Shape> {
        self.get(id).into_iter().flat_map(|s| s.members.values())
    }

    /// Number of root shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Root shapes in insertion order.
    pub fn root_shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    /// Root shapes followed by their members, lazily.
    pub fn all_shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes
            .values()
            .flat_map(|s| std::iter::once(s).chain(s.members.values()))
    }

    /// All shapes (members included) of the given type.
    pub fn shapes_of_type(&self, shape_type: ShapeType) -> impl Iterator<Item = &Shape> {
        self.all_shapes().filter(move |s| s.shape_type() == shape_type)
    }

    /// The structural edges `id` declares. Unknown IDs have none.
    pub fn neighbors(&self, id: &ShapeId) -> Vec<Relationship> {
        self.get(id).map(relationships_of).unwrap_or_default()
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperationData, ShapeKind};

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    fn string() -> Shape {
        Shape::new(id("smithy.api#String"), ShapeKind::String)
    }

    #[test]
    fn insert_and_get() {
        let mut g = ShapeGraph::new();
        g.insert(Shape::new(id("ns#S"), ShapeKind::Structure).with_member("a", id("smithy.api#String")));
        assert_eq!(g.len(), 1);
        assert!(g.get(&id("ns#S")).is_some());
        assert_eq!(g.get(&id("ns#S$a")).unwrap().shape_type(), ShapeType::Member);
        assert!(g.get(&id("ns#S$b")).is_none());
        assert!(g.get(&id("ns#Missing")).is_none());
    }

    #[test]
    fn duplicate_insert_is_deferred() {
        let mut g = ShapeGraph::new();
        g.insert(Shape::new(id("ns#A"), ShapeKind::String));
        g.insert(Shape::new(id("ns#A"), ShapeKind::Integer));
        assert_eq!(g.get(&id("ns#A")).unwrap().shape_type(), ShapeType::String);
        let dups = g.take_duplicates();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].shape_type(), ShapeType::Integer);
        assert!(g.take_duplicates().is_empty());
    }

    #[test]
    fn members_of_preserves_order_and_tolerates_unknown_ids() {
        let g = ShapeGraph::from_shapes([Shape::new(id("ns#S"), ShapeKind::Structure)
            .with_member("z", id("smithy.api#String"))
            .with_member("a", id("smithy.api#String"))]);
        let names: Vec<String> = g
            .members_of(&id("ns#S"))
            .map(|m| m.id.member().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["z", "a"]);
        assert_eq!(g.members_of(&id("ns#Nope")).count(), 0);
    }

    #[test]
    fn all_shapes_includes_members() {
        let g = ShapeGraph::from_shapes([
            string(),
            Shape::new(id("ns#S"), ShapeKind::Structure).with_member("a", id("smithy.api#String")),
        ]);
        assert_eq!(g.all_shapes().count(), 3);
        assert_eq!(g.shapes_of_type(ShapeType::Member).count(), 1);
    }

    #[test]
    fn neighbors_are_the_declared_edges() {
        let g = ShapeGraph::from_shapes([
            string(),
            Shape::new(
                id("ns#Op"),
                ShapeKind::Operation(OperationData {
                    input: Some(id("ns#In")),
                    output: None,
                    errors: vec![id("ns#Missing")],
                }),
            ),
        ]);
        let edges: Vec<(String, String)> = g
            .neighbors(&id("ns#Op"))
            .into_iter()
            .map(|rel| (rel.rel.to_string(), rel.neighbor.to_string()))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("input".to_string(), "ns#In".to_string()),
                ("error".to_string(), "ns#Missing".to_string()),
            ]
        );
        assert!(g.neighbors(&id("ns#Nope")).is_empty());
    }
}
