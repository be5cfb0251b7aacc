//! The front-end contract: a normalized model fragment.
//!
//! A fragment is what an IDL or JSON loader hands to the assembler. Shape
//! IDs inside it may be relative; the assembler resolves them. Fragments are
//! plain serde types so they can be read straight from JSON:
//!
//! ```json
//! {
//!   "namespace": "example.weather",
//!   "use": ["aws.iam#conditionKeys"],
//!   "metadata": {"authors": ["ops"]},
//!   "shapes": {
//!     "City": {"type": "resource", "identifiers": {"cityId": "CityId"}},
//!     "CityId": {"type": "string", "traits": {"pattern": "^[A-Za-z0-9 ]+$"}}
//!   },
//!   "apply": {"City": {"documentation": "A city."}}
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ShapeType;

/// Trait ID (relative or absolute) to trait value.
pub type TraitMap = IndexMap<String, Value>;

/// One unit of model input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Namespace relative shape IDs resolve into. Required when the
    /// fragment contains relative IDs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Absolute IDs whose names take precedence when resolving relative IDs.
    #[serde(default, rename = "use", skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub shapes: IndexMap<String, ShapeDef>,

    /// Traits applied to shapes defined elsewhere: shape ID to traits.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub apply: IndexMap<String, TraitMap>,
}

impl Fragment {
    /// An empty fragment in `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    /// Parse a JSON document holding a single fragment or an array of them.
    pub fn parse_many(json: &str) -> Result<Vec<Fragment>, serde_json::Error> {
        match serde_json::from_str::<Vec<Fragment>>(json) {
            Ok(fragments) => Ok(fragments),
            Err(_) => serde_json::from_str::<Fragment>(json).map(|f| vec![f]),
        }
    }
}

/// A member definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDef {
    pub target: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub traits: TraitMap,
}

impl MemberDef {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            traits: TraitMap::new(),
        }
    }
}

/// A shape definition. Which properties are allowed depends on `type`; the
/// assembler rejects properties that do not belong to the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeDef {
    #[serde(rename = "type")]
    pub shape_type: ShapeType,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub traits: TraitMap,

    /// structure and union members.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub members: IndexMap<String, MemberDef>,

    /// list and set member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberDef>,

    /// map key and value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<MemberDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<MemberDef>,

    /// service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// service and resource
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,

    /// service and operation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// resource
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub identifiers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collection_operations: Vec<String>,

    /// operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl ShapeDef {
    /// A definition of `shape_type` with nothing else set.
    pub fn of(shape_type: ShapeType) -> Self {
        Self {
            shape_type,
            traits: TraitMap::new(),
            members: IndexMap::new(),
            member: None,
            key: None,
            value: None,
            version: None,
            operations: Vec::new(),
            resources: Vec::new(),
            errors: Vec::new(),
            identifiers: IndexMap::new(),
            create: None,
            put: None,
            read: None,
            update: None,
            delete: None,
            list: None,
            collection_operations: Vec::new(),
            input: None,
            output: None,
        }
    }

    /// Names of the properties set on this definition that `shape_type`
    /// does not allow.
    pub fn unexpected_properties(&self) -> Vec<&'static str> {
        let t = self.shape_type;
        let mut out = Vec::new();
        let mut check = |present: bool, allowed: bool, name: &'static str| {
            if present && !allowed {
                out.push(name);
            }
        };
        let is_struct = matches!(t, ShapeType::Structure | ShapeType::Union);
        check(!self.members.is_empty(), is_struct, "members");
        check(self.member.is_some(), t.is_collection(), "member");
        check(self.key.is_some(), t == ShapeType::Map, "key");
        check(self.value.is_some(), t == ShapeType::Map, "value");
        check(self.version.is_some(), t == ShapeType::Service, "version");
        let service_or_resource = matches!(t, ShapeType::Service | ShapeType::Resource);
        check(!self.operations.is_empty(), service_or_resource, "operations");
        check(!self.resources.is_empty(), service_or_resource, "resources");
        check(
            !self.errors.is_empty(),
            matches!(t, ShapeType::Service | ShapeType::Operation),
            "errors",
        );
        let resource = t == ShapeType::Resource;
        check(!self.identifiers.is_empty(), resource, "identifiers");
        check(self.create.is_some(), resource, "create");
        check(self.put.is_some(), resource, "put");
        check(self.read.is_some(), resource, "read");
        check(self.update.is_some(), resource, "update");
        check(self.delete.is_some(), resource, "delete");
        check(self.list.is_some(), resource, "list");
        check(!self.collection_operations.is_empty(), resource, "collectionOperations");
        let operation = t == ShapeType::Operation;
        check(self.input.is_some(), operation, "input");
        check(self.output.is_some(), operation, "output");
        out
    }
}

// --- tests -------------------------------------------------------------------
