//! IAM condition keys per service.
//!
//! A service defines keys explicitly with `@aws.iam#defineConditionKeys`.
//! Resources additionally get one inferred key per identifier they
//! introduce, named `<arnNamespace>:<ResourceName><Identifier>`. A resource
//! inherits the keys of its parent resources; operations only get the keys
//! they name themselves.

use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;

use crate::model::Model;
use crate::prelude::ids;
use crate::shape_id::ShapeId;
use crate::types::Shape;

const STRING_TYPE: &str = "String";
const ARN_TYPE: &str = "ARN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionKeyDefinition {
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl ConditionKeyDefinition {
    fn from_node(node: &Value) -> Self {
        Self {
            key_type: node
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(STRING_TYPE)
                .to_string(),
            documentation: node
                .get("documentation")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConditionKeysIndex {
    definitions: HashMap<ShapeId, BTreeMap<String, ConditionKeyDefinition>>,
    keys: HashMap<ShapeId, HashMap<ShapeId, IndexSet<String>>>,
}

impl ConditionKeysIndex {
    pub fn build(model: &Model) -> Self {
        let mut index = ConditionKeysIndex::default();

        for service in model.graph().root_shapes() {
            let Some(data) = service.as_service() else {
                continue;
            };
            let namespace = arn_namespace(model, service);

            let definitions: BTreeMap<String, ConditionKeyDefinition> = model
                .traits()
                .get(&service.id, &ids::define_condition_keys())
                .and_then(Value::as_object)
                .map(|map| {
                    map.iter()
                        .map(|(k, v)| (k.clone(), ConditionKeyDefinition::from_node(v)))
                        .collect()
                })
                .unwrap_or_default();

            let mut builder = Builder {
                model,
                namespace,
                definitions,
                keys: HashMap::new(),
                visiting: HashSet::new(),
            };
            for resource in &data.resources {
                builder.resource(resource, &IndexSet::new(), &IndexMap::new());
            }
            for operation in &data.operations {
                builder.operation(operation);
            }

            index.definitions.insert(service.id.clone(), builder.definitions);
            index.keys.insert(service.id.clone(), builder.keys);
        }

        index
    }

    /// Keys defined by the service, explicit and inferred, by name.
    pub fn defined_keys(&self, service: &ShapeId) -> Option<&BTreeMap<String, ConditionKeyDefinition>> {
        self.definitions.get(service)
    }

    /// Condition key names of a resource or operation within `service`, in
    /// the order they were collected.
    pub fn key_names(&self, service: &ShapeId, subject: &ShapeId) -> Option<&IndexSet<String>> {
        self.keys.get(service)?.get(subject)
    }

    /// Every key name used anywhere in `service`, sorted.
    pub fn all_key_names(&self, service: &ShapeId) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .keys
            .get(service)
            .into_iter()
            .flat_map(|subjects| subjects.values())
            .flatten()
            .map(String::as_str)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// `@aws.api#service(arnNamespace)`, else the lowercased service name.
pub fn arn_namespace(model: &Model, service: &Shape) -> String {
    model
        .traits()
        .get(&service.id, &ids::aws_service())
        .and_then(|v| v.get("arnNamespace"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| service.id.name().to_lowercase())
}

struct Builder<'m> {
    model: &'m Model,
    namespace: String,
    definitions: BTreeMap<String, ConditionKeyDefinition>,
    keys: HashMap<ShapeId, IndexSet<String>>,
    visiting: HashSet<ShapeId>,
}

impl Builder<'_> {
    fn resource(
        &mut self,
        id: &ShapeId,
        parent_keys: &IndexSet<String>,
        parent_identifiers: &IndexMap<String, ShapeId>,
    ) {
        let model = self.model;
        let Some(shape) = model.get_shape(id) else {
            return;
        };
        let Some(resource) = shape.as_resource() else {
            return;
        };
        if !self.visiting.insert(id.clone()) {
            return;
        }

        let mut keys = parent_keys.clone();
        if !model.traits().has(id, &ids::disable_condition_key_inference()) {
            let resource_name = model
                .traits()
                .get(id, &ids::iam_resource())
                .and_then(|v| v.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| id.name().to_string());
            for (identifier, target) in &resource.identifiers {
                if parent_identifiers.contains_key(identifier) {
                    continue;
                }
                let key = format!("{}:{}{}", self.namespace, resource_name, capitalize(identifier));
                let key_type = if model.traits().has(target, &ids::arn_reference()) {
                    ARN_TYPE
                } else {
                    STRING_TYPE
                };
                self.definitions
                    .entry(key.clone())
                    .or_insert_with(|| ConditionKeyDefinition {
                        key_type: key_type.to_string(),
                        documentation: Some(format!("{} resource {} identifier", resource_name, identifier)),
                    });
                keys.insert(key);
            }
        }
        keys.extend(self.explicit_keys(id));

        for operation in resource.all_operations() {
            self.operation(operation);
        }
        for child in &resource.resources {
            self.resource(child, &keys, &resource.identifiers);
        }

        self.keys.insert(id.clone(), keys);
        self.visiting.remove(id);
    }

    fn operation(&mut self, id: &ShapeId) {
        if self.model.get_shape(id).is_none() {
            return;
        }
        let keys: IndexSet<String> = self.explicit_keys(id).collect();
        self.keys.entry(id.clone()).or_default().extend(keys);
    }

    /// `@aws.iam#conditionKeys` values; names without a `:` are scoped to
    /// the service's ARN namespace.
    fn explicit_keys(&self, id: &ShapeId) -> impl Iterator<Item = String> + '_ {
        self.model
            .traits()
            .get(id, &ids::condition_keys())
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(|key| {
                if key.contains(':') {
                    key.to_string()
                } else {
                    format!("{}:{}", self.namespace, key)
                }
            })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// --- tests -------------------------------------------------------------------
