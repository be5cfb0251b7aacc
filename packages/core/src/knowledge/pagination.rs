//! `@paginated` settings merged from service defaults.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::Shape;

/// The four pagination properties. Any may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<String>,
}

impl PaginationInfo {
    pub fn from_node(node: &Value) -> Self {
        let get = |key: &str| node.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            input_token: get("inputToken"),
            output_token: get("outputToken"),
            items: get("items"),
            page_size: get("pageSize"),
        }
    }

    /// `self` (operation level) over `defaults` (service level), property by
    /// property.
    pub fn merged_over(&self, defaults: &PaginationInfo) -> PaginationInfo {
        PaginationInfo {
            input_token: self.input_token.clone().or_else(|| defaults.input_token.clone()),
            output_token: self.output_token.clone().or_else(|| defaults.output_token.clone()),
            items: self.items.clone().or_else(|| defaults.items.clone()),
            page_size: self.page_size.clone().or_else(|| defaults.page_size.clone()),
        }
    }
}

#[derive(Debug, Default)]
pub struct PaginationIndex {
    merged: HashMap<(ShapeId, ShapeId), PaginationInfo>,
}

impl PaginationIndex {
    pub fn build(model: &Model) -> Self {
        let mut index = PaginationIndex::default();
        let traits = model.traits();

        for service in model.graph().root_shapes() {
            if service.as_service().is_none() {
                continue;
            }
            let defaults = traits
                .get_prelude(&service.id, "paginated")
                .map(PaginationInfo::from_node)
                .unwrap_or_default();
            for operation in model.top_down().contained_operations(&service.id) {
                if let Some(node) = traits.get_prelude(operation, "paginated") {
                    let info = PaginationInfo::from_node(node).merged_over(&defaults);
                    index
                        .merged
                        .insert((service.id.clone(), operation.clone()), info);
                }
            }
        }

        index
    }

    /// Pagination of a paginated operation as seen from `service`.
    pub fn get(&self, service: &ShapeId, operation: &ShapeId) -> Option<&PaginationInfo> {
        self.merged.get(&(service.clone(), operation.clone()))
    }
}

/// Follow a dot-separated member path from `start`, returning each member
/// visited. `None` when a segment does not name a member of the current
/// structure.
pub fn resolve_member_path<'m>(model: &'m Model, start: &ShapeId, path: &str) -> Option<Vec<&'m Shape>> {
    let mut current = model.get_shape(start)?;
    let mut members = Vec::new();
    for segment in path.split('.') {
        let member = current.members.get(segment)?;
        members.push(member);
        current = model.get_shape(member.target()?)?;
    }
    Some(members)
}

// --- tests -------------------------------------------------------------------
