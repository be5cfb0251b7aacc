//! Shape data types.
//!
//! A [`Shape`] is a node of the model graph. Its [`ShapeKind`] is a closed
//! set of variants, and aggregate shapes own their members as nested
//! [`Shape`]s of kind [`ShapeKind::Member`]. Members refer to their target by
//! [`ShapeId`] only, so the graph never owns cycles.
//!
//! Traits are not stored on shapes; see [`crate::traits::TraitIndex`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::shape_id::ShapeId;

/// The type of a shape, without its data.
///
/// Serialises as the camelCase type name used in fragments (e.g.
/// `"bigInteger"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ShapeType {
    Blob,
    Boolean,
    String,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    Timestamp,
    Document,
    List,
    Set,
    Map,
    Structure,
    Union,
    Member,
    Service,
    Resource,
    Operation,
}

impl ShapeType {
    pub const ALL: [ShapeType; 22] = [
        ShapeType::Blob,
        ShapeType::Boolean,
        ShapeType::String,
        ShapeType::Byte,
        ShapeType::Short,
        ShapeType::Integer,
        ShapeType::Long,
        ShapeType::Float,
        ShapeType::Double,
        ShapeType::BigInteger,
        ShapeType::BigDecimal,
        ShapeType::Timestamp,
        ShapeType::Document,
        ShapeType::List,
        ShapeType::Set,
        ShapeType::Map,
        ShapeType::Structure,
        ShapeType::Union,
        ShapeType::Member,
        ShapeType::Service,
        ShapeType::Resource,
        ShapeType::Operation,
    ];

    /// The wire name (e.g. `"bigDecimal"`).
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeType::Blob => "blob",
            ShapeType::Boolean => "boolean",
            ShapeType::String => "string",
            ShapeType::Byte => "byte",
            ShapeType::Short => "short",
            ShapeType::Integer => "integer",
            ShapeType::Long => "long",
            ShapeType::Float => "float",
            ShapeType::Double => "double",
            ShapeType::BigInteger => "bigInteger",
            ShapeType::BigDecimal => "bigDecimal",
            ShapeType::Timestamp => "timestamp",
            ShapeType::Document => "document",
            ShapeType::List => "list",
            ShapeType::Set => "set",
            ShapeType::Map => "map",
            ShapeType::Structure => "structure",
            ShapeType::Union => "union",
            ShapeType::Member => "member",
            ShapeType::Service => "service",
            ShapeType::Resource => "resource",
            ShapeType::Operation => "operation",
        }
    }

    /// byte, short, integer, long, float, double, bigInteger, bigDecimal.
    pub fn is_number(self) -> bool {
        self.is_integral() || self.is_floating()
    }

    /// byte, short, integer, long, bigInteger.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            ShapeType::Byte
                | ShapeType::Short
                | ShapeType::Integer
                | ShapeType::Long
                | ShapeType::BigInteger
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, ShapeType::Float | ShapeType::Double | ShapeType::BigDecimal)
    }

    /// Simple shapes: scalars plus document.
    pub fn is_simple(self) -> bool {
        matches!(
            self,
            ShapeType::Blob
                | ShapeType::Boolean
                | ShapeType::String
                | ShapeType::Timestamp
                | ShapeType::Document
        ) || self.is_number()
    }

    /// list and set.
    pub fn is_collection(self) -> bool {
        matches!(self, ShapeType::List | ShapeType::Set)
    }

    /// Shapes that own members.
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            ShapeType::List | ShapeType::Set | ShapeType::Map | ShapeType::Structure | ShapeType::Union
        )
    }

    /// service, resource, operation.
    pub fn is_service_kind(self) -> bool {
        matches!(self, ShapeType::Service | ShapeType::Resource | ShapeType::Operation)
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a [`ShapeType`] from its wire name.
impl std::str::FromStr for ShapeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShapeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown shape type {:?}; expected one of: blob, boolean, string, byte, \
                     short, integer, long, float, double, bigInteger, bigDecimal, timestamp, \
                     document, list, set, map, structure, union, member, service, resource, \
                     operation",
                    s
                )
            })
    }
}

/// Properties of a service shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceData {
    pub version: String,
    pub operations: Vec<ShapeId>,
    pub resources: Vec<ShapeId>,
    pub errors: Vec<ShapeId>,
}

/// Properties of a resource shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceData {
    /// Identifier name to the shape it targets, in declaration order.
    pub identifiers: IndexMap<String, ShapeId>,
    pub create: Option<ShapeId>,
    pub put: Option<ShapeId>,
    pub read: Option<ShapeId>,
    pub update: Option<ShapeId>,
    pub delete: Option<ShapeId>,
    pub list: Option<ShapeId>,
    /// Instance operations bound outside the lifecycle.
    pub operations: Vec<ShapeId>,
    /// Collection operations bound outside the lifecycle.
    pub collection_operations: Vec<ShapeId>,
    pub resources: Vec<ShapeId>,
}

impl ResourceData {
    /// Every operation bound to the resource, lifecycle first, without
    /// duplicates.
    pub fn all_operations(&self) -> Vec<&ShapeId> {
        let mut out: Vec<&ShapeId> = Vec::new();
        let lifecycle = [
            &self.create,
            &self.put,
            &self.read,
            &self.update,
            &self.delete,
            &self.list,
        ];
        for id in lifecycle.into_iter().flatten() {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        for id in self.operations.iter().chain(&self.collection_operations) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}

/// Properties of an operation shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationData {
    pub input: Option<ShapeId>,
    pub output: Option<ShapeId>,
    pub errors: Vec<ShapeId>,
}

/// The closed set of shape variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    Blob,
    Boolean,
    String,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    Timestamp,
    Document,
    List,
    Set,
    Map,
    Structure,
    Union,
    Member { target: ShapeId },
    Service(ServiceData),
    Resource(ResourceData),
    Operation(OperationData),
}

impl ShapeKind {
    /// The data-less kind for a simple or aggregate type. Returns `None` for
    /// member, service, resource and operation, which carry data.
    pub fn plain(shape_type: ShapeType) -> Option<Self> {
        Some(match shape_type {
            ShapeType::Blob => ShapeKind::Blob,
            ShapeType::Boolean => ShapeKind::Boolean,
            ShapeType::String => ShapeKind::String,
            ShapeType::Byte => ShapeKind::Byte,
            ShapeType::Short => ShapeKind::Short,
            ShapeType::Integer => ShapeKind::Integer,
            ShapeType::Long => ShapeKind::Long,
            ShapeType::Float => ShapeKind::Float,
            ShapeType::Double => ShapeKind::Double,
            ShapeType::BigInteger => ShapeKind::BigInteger,
            ShapeType::BigDecimal => ShapeKind::BigDecimal,
            ShapeType::Timestamp => ShapeKind::Timestamp,
            ShapeType::Document => ShapeKind::Document,
            ShapeType::List => ShapeKind::List,
            ShapeType::Set => ShapeKind::Set,
            ShapeType::Map => ShapeKind::Map,
            ShapeType::Structure => ShapeKind::Structure,
            ShapeType::Union => ShapeKind::Union,
            ShapeType::Member | ShapeType::Service | ShapeType::Resource | ShapeType::Operation => {
                return None
            }
        })
    }

    pub fn shape_type(&self) -> ShapeType {
        match self {
            ShapeKind::Blob => ShapeType::Blob,
            ShapeKind::Boolean => ShapeType::Boolean,
            ShapeKind::String => ShapeType::String,
            ShapeKind::Byte => ShapeType::Byte,
            ShapeKind::Short => ShapeType::Short,
            ShapeKind::Integer => ShapeType::Integer,
            ShapeKind::Long => ShapeType::Long,
            ShapeKind::Float => ShapeType::Float,
            ShapeKind::Double => ShapeType::Double,
            ShapeKind::BigInteger => ShapeType::BigInteger,
            ShapeKind::BigDecimal => ShapeType::BigDecimal,
            ShapeKind::Timestamp => ShapeType::Timestamp,
            ShapeKind::Document => ShapeType::Document,
            ShapeKind::List => ShapeType::List,
            ShapeKind::Set => ShapeType::Set,
            ShapeKind::Map => ShapeType::Map,
            ShapeKind::Structure => ShapeType::Structure,
            ShapeKind::Union => ShapeType::Union,
            ShapeKind::Member { .. } => ShapeType::Member,
            ShapeKind::Service(_) => ShapeType::Service,
            ShapeKind::Resource(_) => ShapeType::Resource,
            ShapeKind::Operation(_) => ShapeType::Operation,
        }
    }
}

/// A shape: its absolute ID, its kind, and (for aggregates) its members in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub members: IndexMap<String, Shape>,
}

impl Shape {
    /// A shape with no members.
    pub fn new(id: ShapeId, kind: ShapeKind) -> Self {
        Self {
            id,
            kind,
            members: IndexMap::new(),
        }
    }

    /// A member shape targeting `target`. `id` must carry the member name.
    pub fn member(id: ShapeId, target: ShapeId) -> Self {
        Self::new(id, ShapeKind::Member { target })
    }

    /// Builder-style: add a member named `name` targeting `target`.
    ///
    /// Returns the shape unchanged if `name` is not a valid identifier.
    pub fn with_member(mut self, name: &str, target: ShapeId) -> Self {
        if let Ok(member_id) = self.id.with_member(name) {
            self.members
                .insert(name.to_string(), Shape::member(member_id, target));
        }
        self
    }

    pub fn shape_type(&self) -> ShapeType {
        self.kind.shape_type()
    }

    /// The target of a member shape.
    pub fn target(&self) -> Option<&ShapeId> {
        match &self.kind {
            ShapeKind::Member { target } => Some(target),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceData> {
        match &self.kind {
            ShapeKind::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceData> {
        match &self.kind {
            ShapeKind::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&OperationData> {
        match &self.kind {
            ShapeKind::Operation(o) => Some(o),
            _ => None,
        }
    }

    /// Member name to target, in declaration order.
    pub fn member_targets(&self) -> Vec<(&str, &ShapeId)> {
        self.members
            .iter()
            .filter_map(|(name, m)| m.target().map(|t| (name.as_str(), t)))
            .collect()
    }

    /// Whether two definitions of the same ID describe the same shape: same
    /// kind (including service/resource/operation properties) and the same
    /// member names and targets.
    pub fn is_compatible_with(&self, other: &Shape) -> bool {
        self.kind == other.kind && self.member_targets() == other.member_targets()
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    #[test]
    fn shape_type_round_trips_through_strings() {
        for t in ShapeType::ALL {
            assert_eq!(t.to_string().parse::<ShapeType>().unwrap(), t);
        }
        assert!("Structure".parse::<ShapeType>().is_err());
    }

    #[test]
    fn shape_type_serde_uses_camel_case() {
        let json = serde_json::to_string(&ShapeType::BigDecimal).unwrap();
        assert_eq!(json, "\"bigDecimal\"");
    }

    #[test]
    fn categories() {
        assert!(ShapeType::Byte.is_number());
        assert!(ShapeType::BigDecimal.is_floating());
        assert!(ShapeType::Timestamp.is_simple());
        assert!(ShapeType::Document.is_simple());
        assert!(!ShapeType::Map.is_collection());
        assert!(ShapeType::Set.is_collection());
        assert!(ShapeType::Union.is_aggregate());
        assert!(!ShapeType::Member.is_simple());
    }

    #[test]
    fn builder_adds_members_in_order() {
        let s = Shape::new(id("ns#S"), ShapeKind::Structure)
            .with_member("b", id("smithy.api#String"))
            .with_member("a", id("smithy.api#Integer"));
        let names: Vec<&String> = s.members.keys().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(s.members["a"].id, id("ns#S$a"));
        assert_eq!(s.members["a"].target(), Some(&id("smithy.api#Integer")));
    }

    #[test]
    fn compatibility_requires_same_member_targets() {
        let a = Shape::new(id("ns#S"), ShapeKind::Structure).with_member("x", id("ns#T"));
        let b = Shape::new(id("ns#S"), ShapeKind::Structure).with_member("x", id("ns#T"));
        let c = Shape::new(id("ns#S"), ShapeKind::Structure).with_member("x", id("ns#U"));
        let d = Shape::new(id("ns#S"), ShapeKind::Union).with_member("x", id("ns#T"));
        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
        assert!(!a.is_compatible_with(&d));
    }

    #[test]
    fn resource_operations_are_deduplicated() {
        let op = id("ns#Op");
        let data = ResourceData {
            read: Some(op.clone()),
            operations: vec![op.clone(), id("ns#Other")],
            ..Default::default()
        };
        assert_eq!(data.all_operations(), vec![&op, &id("ns#Other")]);
    }
}
