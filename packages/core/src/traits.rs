//! Applied traits and trait definitions.
//!
//! The [`TraitIndex`] is the only place trait values live. Values are
//! dynamically typed [`Value`]s; their shape is checked later by the
//! node validator.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::shape_id::ShapeId;
use crate::types::ShapeType;

/// The trait that marks a shape as a trait definition.
pub const TRAIT_TRAIT: &str = "smithy.api#trait";

/// Errors returned by [`TraitIndex::apply`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TraitError {
    /// Two different values for a non-list trait on one shape.
    #[error("Conflicting `{trait_id}` trait found on shape `{shape}`: {existing} vs {new}")]
    Conflict {
        shape: ShapeId,
        trait_id: ShapeId,
        existing: Value,
        new: Value,
    },

    /// The trait is declared as conflicting with a trait already present.
    #[error("Found conflicting traits on shape `{shape}`: `{trait_id}` conflicts with `{other}`")]
    Conflicting {
        shape: ShapeId,
        trait_id: ShapeId,
        other: ShapeId,
    },
}

/// Where a structurally exclusive trait may appear at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructurallyExclusive {
    /// Only one member of a structure can carry the trait.
    Member,
    /// Only one member of a structure can target a shape carrying the trait.
    Target,
}

/// A trait definition, read from the `smithy.api#trait` value on a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitDefinition {
    pub id: ShapeId,
    /// Type of the trait shape; list and set traits merge by concatenation.
    pub shape_type: ShapeType,
    /// Selector source, `*` when absent.
    pub selector: String,
    pub conflicts: Vec<ShapeId>,
    pub structurally_exclusive: Option<StructurallyExclusive>,
}

impl TraitDefinition {
    /// Read a definition from the trait value. Malformed properties are
    /// ignored here; the node validator reports them against the prelude
    /// `trait` structure.
    pub fn from_node(id: ShapeId, shape_type: ShapeType, value: &Value) -> Self {
        let selector = value
            .get("selector")
            .and_then(Value::as_str)
            .unwrap_or("*")
            .to_string();
        let conflicts = value
            .get("conflicts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|s| s.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        let structurally_exclusive = match value.get("structurallyExclusive").and_then(Value::as_str)
        {
            Some("member") => Some(StructurallyExclusive::Member),
            Some("target") => Some(StructurallyExclusive::Target),
            _ => None,
        };
        Self {
            id,
            shape_type,
            selector,
            conflicts,
            structurally_exclusive,
        }
    }

    pub fn is_list(&self) -> bool {
        self.shape_type.is_collection()
    }
}

/// Applied trait values by shape, plus every known trait definition.
#[derive(Debug, Default, Clone)]
pub struct TraitIndex {
    applied: HashMap<ShapeId, IndexMap<ShapeId, Value>>,
    definitions: HashMap<ShapeId, TraitDefinition>,
}

static EMPTY: std::sync::LazyLock<IndexMap<ShapeId, Value>> = std::sync::LazyLock::new(IndexMap::new);

impl TraitIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The traits applied to `id`, in application order.
    pub fn applied_traits(&self, id: &ShapeId) -> &IndexMap<ShapeId, Value> {
        self.applied.get(id).unwrap_or(&EMPTY)
    }

    /// The value of `trait_id` on `id`.
    pub fn get(&self, id: &ShapeId, trait_id: &ShapeId) -> Option<&Value> {
        self.applied.get(id).and_then(|t| t.get(trait_id))
    }

    pub fn has(&self, id: &ShapeId, trait_id: &ShapeId) -> bool {
        self.get(id, trait_id).is_some()
    }

    /// Convenience for prelude traits: `has_prelude(id, "required")`.
    pub fn has_prelude(&self, id: &ShapeId, name: &str) -> bool {
        self.has(id, &ShapeId::prelude(name))
    }

    pub fn get_prelude(&self, id: &ShapeId, name: &str) -> Option<&Value> {
        self.get(id, &ShapeId::prelude(name))
    }

    pub fn trait_definition(&self, trait_id: &ShapeId) -> Option<&TraitDefinition> {
        self.definitions.get(trait_id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TraitDefinition> {
        self.definitions.values()
    }

    pub fn register_definition(&mut self, definition: TraitDefinition) {
        self.definitions.insert(definition.id.clone(), definition);
    }

    /// Shapes that carry `trait_id`, sorted.
    pub fn shapes_with_trait(&self, trait_id: &ShapeId) -> BTreeSet<&ShapeId> {
        self.applied
            .iter()
            .filter(|(_, traits)| traits.contains_key(trait_id))
            .map(|(id, _)| id)
            .collect()
    }

    /// Every shape that has at least one trait.
    pub fn shapes(&self) -> impl Iterator<Item = &ShapeId> {
        self.applied.keys()
    }

    /// Apply `value` for `trait_id` to `shape`.
    ///
    /// An identical value is a no-op. A list or set trait concatenates the
    /// new elements after the existing ones. Any other differing value is a
    /// [`TraitError::Conflict`] and the stored value is unchanged. On a
    /// fresh application the definitions' `conflicts` lists are checked
    /// against the traits already on the shape; the value is still stored
    /// when that check fails.
    pub fn apply(&mut self, shape: &ShapeId, trait_id: &ShapeId, value: Value) -> Result<(), TraitError> {
        let is_list = self
            .definitions
            .get(trait_id)
            .map(TraitDefinition::is_list);

        let traits = self.applied.entry(shape.clone()).or_default();
        if let Some(existing) = traits.get_mut(trait_id) {
            if *existing == value {
                return Ok(());
            }
            let concatenate = match is_list {
                Some(list) => list,
                None => existing.is_array() && value.is_array(),
            };
            if concatenate {
                if let (Value::Array(current), Value::Array(extra)) = (&mut *existing, &value) {
                    current.extend(extra.iter().cloned());
                    return Ok(());
                }
            }
            return Err(TraitError::Conflict {
                shape: shape.clone(),
                trait_id: trait_id.clone(),
                existing: existing.clone(),
                new: value,
            });
        }

        traits.insert(trait_id.clone(), value);
        self.check_conflicting(shape, trait_id)
    }

    fn check_conflicting(&self, shape: &ShapeId, trait_id: &ShapeId) -> Result<(), TraitError> {
        let applied = self.applied_traits(shape);
        let declared = self
            .definitions
            .get(trait_id)
            .map(|d| d.conflicts.as_slice())
            .unwrap_or(&[]);
        for other in applied.keys().filter(|other| *other != trait_id) {
            let reverse = self
                .definitions
                .get(other)
                .is_some_and(|d| d.conflicts.contains(trait_id));
            if declared.contains(other) || reverse {
                return Err(TraitError::Conflicting {
                    shape: shape.clone(),
                    trait_id: trait_id.clone(),
                    other: other.clone(),
                });
            }
        }
        Ok(())
    }
}

// --- tests -------------------------------------------------------------------
