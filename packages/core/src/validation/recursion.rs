//! Shape recursion that can never produce a finite value.
//!
//! Two cycles are rejected: a list, set or map that contains itself without
//! passing through a structure or union, and a structure that reaches itself
//! through `@required` members only.

use std::collections::HashSet;

use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::{Shape, ShapeType};
use crate::validation::{Validator, Violation, ViolationKind};

pub struct ShapeRecursionValidator;

impl Validator for ShapeRecursionValidator {
    fn name(&self) -> &'static str {
        "ShapeRecursion"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();
        for shape in model.graph().root_shapes() {
            let t = shape.shape_type();
            if t.is_collection() || t == ShapeType::Map {
                if let Some(path) = find_cycle(model, shape, &collection_edges) {
                    violations.push(Violation::error(
                        ViolationKind::RecursiveShape,
                        &shape.id,
                        format!(
                            "Found invalid shape recursion: {}. A recursive list, set, or map shape is only valid if an intermediate reference is through a union or structure.",
                            render_path(&path)
                        ),
                    ));
                }
            } else if t == ShapeType::Structure {
                if let Some(path) = find_cycle(model, shape, &required_edges) {
                    violations.push(Violation::error(
                        ViolationKind::RecursiveShape,
                        &shape.id,
                        format!(
                            "Found invalid shape recursion: {}. A structure cannot be mutually recursive through all required members.",
                            render_path(&path)
                        ),
                    ));
                }
            }
        }
        violations
    }
}

/// Members of a list, set or map whose targets are followed. Structures and
/// unions break the cycle, so their members are never followed.
fn collection_edges<'m>(model: &'m Model, shape: &'m Shape) -> Vec<(&'m Shape, &'m Shape)> {
    let t = shape.shape_type();
    if !(t.is_collection() || t == ShapeType::Map) {
        return Vec::new();
    }
    follow(model, shape, |_| true)
}

/// Required members of a structure.
fn required_edges<'m>(model: &'m Model, shape: &'m Shape) -> Vec<(&'m Shape, &'m Shape)> {
    if shape.shape_type() != ShapeType::Structure {
        return Vec::new();
    }
    follow(model, shape, |member| model.traits().has_prelude(&member.id, "required"))
}

fn follow<'m>(
    model: &'m Model,
    shape: &'m Shape,
    keep: impl Fn(&Shape) -> bool,
) -> Vec<(&'m Shape, &'m Shape)> {
    shape
        .members
        .values()
        .filter(|member| keep(member))
        .filter_map(|member| {
            let target = model.get_shape(member.target()?)?;
            Some((member, target))
        })
        .collect()
}

type Edges = dyn for<'m> Fn(&'m Model, &'m Shape) -> Vec<(&'m Shape, &'m Shape)>;

/// Depth-first search from `start` back to itself. Returns the member IDs
/// traversed, ending at `start`.
fn find_cycle(model: &Model, start: &Shape, edges: &Edges) -> Option<Vec<ShapeId>> {
    let mut visited: HashSet<&ShapeId> = HashSet::new();
    let mut path: Vec<ShapeId> = Vec::new();
    if search(model, start, &start.id, edges, &mut visited, &mut path) {
        path.push(start.id.clone());
        Some(path)
    } else {
        None
    }
}

fn search<'m>(
    model: &'m Model,
    current: &'m Shape,
    start: &ShapeId,
    edges: &Edges,
    visited: &mut HashSet<&'m ShapeId>,
    path: &mut Vec<ShapeId>,
) -> bool {
    if !visited.insert(&current.id) {
        return false;
    }
    for (member, target) in edges(model, current) {
        path.push(member.id.clone());
        if target.id == *start || search(model, target, start, edges, visited, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn render_path(path: &[ShapeId]) -> String {
    path.iter()
        .map(ShapeId::to_string)
        .collect::<Vec<_>>()
        .join(" > ")
}

// --- tests -------------------------------------------------------------------
