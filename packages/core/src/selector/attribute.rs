//! Attribute values and comparison for `[...]` selectors.

use std::collections::BTreeSet;
use std::rc::Rc;

use serde_json::Value;

use super::ast::Comparator;
use super::eval::Vars;
use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::Shape;

/// A value reached by walking an attribute path from a shape.
#[derive(Debug, Clone)]
pub(crate) enum AttributeValue<'m> {
    Null,
    Literal(String),
    Node(&'m Value),
    Projection(Vec<AttributeValue<'m>>),
    Id(ShapeId),
    Shape(&'m Shape),
    Service(&'m Shape),
    Traits(&'m Shape),
    Vars(Rc<Vars>),
}

impl<'m> AttributeValue<'m> {
    pub fn path(self, keys: &[String], model: &'m Model) -> AttributeValue<'m> {
        keys.iter()
            .fold(self, |value, key| value.property(key, model))
    }

    pub fn property(&self, key: &str, model: &'m Model) -> AttributeValue<'m> {
        match self {
            AttributeValue::Null => AttributeValue::Null,
            AttributeValue::Literal(s) => match key {
                "(length)" => AttributeValue::Literal(s.chars().count().to_string()),
                _ => AttributeValue::Null,
            },
            AttributeValue::Id(id) => match key {
                "namespace" => AttributeValue::Literal(id.namespace().to_string()),
                "name" => AttributeValue::Literal(id.name().to_string()),
                "member" => id
                    .member()
                    .map(|m| AttributeValue::Literal(m.to_string()))
                    .unwrap_or(AttributeValue::Null),
                "(length)" => AttributeValue::Literal(id.to_string().chars().count().to_string()),
                _ => AttributeValue::Null,
            },
            AttributeValue::Shape(shape) => match key {
                "id" => AttributeValue::Id(shape.id.clone()),
                "service" => match shape.as_service() {
                    Some(_) => AttributeValue::Service(*shape),
                    None => AttributeValue::Null,
                },
                "trait" => AttributeValue::Traits(*shape),
                _ => AttributeValue::Null,
            },
            AttributeValue::Service(shape) => match key {
                "id" => AttributeValue::Id(shape.id.clone()),
                "version" => shape
                    .as_service()
                    .map(|s| AttributeValue::Literal(s.version.clone()))
                    .unwrap_or(AttributeValue::Null),
                _ => AttributeValue::Null,
            },
            AttributeValue::Traits(shape) => {
                let applied = model.traits().applied_traits(&shape.id);
                match key {
                    "(keys)" => AttributeValue::Projection(
                        applied.keys().map(|k| AttributeValue::Id(k.clone())).collect(),
                    ),
                    "(values)" => {
                        AttributeValue::Projection(applied.values().map(AttributeValue::Node).collect())
                    }
                    "(length)" => AttributeValue::Literal(applied.len().to_string()),
                    _ => match trait_id(key) {
                        Some(id) => applied
                            .get(&id)
                            .map(AttributeValue::Node)
                            .unwrap_or(AttributeValue::Null),
                        None => AttributeValue::Null,
                    },
                }
            }
            AttributeValue::Node(node) => node_property(*node, key),
            AttributeValue::Vars(vars) => match vars.get(key) {
                Some(ids) => AttributeValue::Projection(
                    ids.iter()
                        .filter_map(|id| model.get_shape(id))
                        .map(AttributeValue::Shape)
                        .collect(),
                ),
                None => AttributeValue::Null,
            },
            AttributeValue::Projection(items) => AttributeValue::Projection(
                items
                    .iter()
                    .map(|item| item.property(key, model))
                    .filter(AttributeValue::is_present)
                    .collect(),
            ),
        }
    }

    /// Whether the value exists. `null` nodes and empty projections do not.
    pub fn is_present(&self) -> bool {
        match self {
            AttributeValue::Null => false,
            AttributeValue::Node(Value::Null) => false,
            AttributeValue::Projection(items) => !items.is_empty(),
            _ => true,
        }
    }

    /// The comparable string form, if the value has one.
    pub fn as_string(&self) -> Option<String> {
        match self {
            AttributeValue::Literal(s) => Some(s.clone()),
            AttributeValue::Id(id) => Some(id.to_string()),
            AttributeValue::Shape(shape) | AttributeValue::Service(shape) => Some(shape.id.to_string()),
            AttributeValue::Node(node) => match node {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Projections expanded recursively; scalars yield themselves.
    pub fn flatten(&self) -> Vec<&AttributeValue<'m>> {
        match self {
            AttributeValue::Projection(items) => items.iter().flat_map(|i| i.flatten()).collect(),
            other => vec![other],
        }
    }
}

fn node_property<'m>(node: &'m Value, key: &str) -> AttributeValue<'m> {
    match (node, key) {
        (Value::Object(map), "(keys)") => AttributeValue::Projection(
            map.keys().map(|k| AttributeValue::Literal(k.clone())).collect(),
        ),
        (Value::Object(map), "(values)") => {
            AttributeValue::Projection(map.values().map(AttributeValue::Node).collect())
        }
        (Value::Object(map), "(length)") => AttributeValue::Literal(map.len().to_string()),
        (Value::Object(map), key) => map
            .get(key)
            .map(AttributeValue::Node)
            .unwrap_or(AttributeValue::Null),
        (Value::Array(items), "(values)") => {
            AttributeValue::Projection(items.iter().map(AttributeValue::Node).collect())
        }
        (Value::Array(items), "(length)") => AttributeValue::Literal(items.len().to_string()),
        (Value::Array(items), key) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .map(AttributeValue::Node)
            .unwrap_or(AttributeValue::Null),
        (Value::String(s), "(length)") => AttributeValue::Literal(s.chars().count().to_string()),
        _ => AttributeValue::Null,
    }
}

/// Relative trait names resolve to the prelude.
fn trait_id(key: &str) -> Option<ShapeId> {
    if key.contains('#') {
        key.parse().ok()
    } else {
        ShapeId::from_parts(crate::shape_id::PRELUDE_NAMESPACE, key, None).ok()
    }
}

/// Compare `lhs` against every value in `rhs`.
pub(crate) fn compare(
    lhs: &AttributeValue<'_>,
    comparator: Comparator,
    rhs: &[AttributeValue<'_>],
    case_insensitive: bool,
) -> bool {
    let fold = |s: String| if case_insensitive { s.to_lowercase() } else { s };

    if comparator.is_projection() {
        let left: BTreeSet<String> = lhs
            .flatten()
            .into_iter()
            .filter_map(AttributeValue::as_string)
            .map(fold)
            .collect();
        let right: BTreeSet<String> = rhs
            .iter()
            .flat_map(AttributeValue::flatten)
            .filter_map(AttributeValue::as_string)
            .map(fold)
            .collect();
        return match comparator {
            Comparator::SetEqual => left == right,
            Comparator::SetNotEqual => left != right,
            Comparator::Subset => left.is_subset(&right),
            Comparator::ProperSubset => left.is_subset(&right) && left != right,
            _ => false,
        };
    }

    if comparator == Comparator::Exists {
        let present = lhs.is_present();
        return rhs
            .iter()
            .filter_map(AttributeValue::as_string)
            .any(|r| match r.as_str() {
                "true" => present,
                "false" => !present,
                _ => false,
            });
    }

    let right: Vec<String> = rhs
        .iter()
        .flat_map(AttributeValue::flatten)
        .filter_map(AttributeValue::as_string)
        .map(fold)
        .collect();
    lhs.flatten()
        .into_iter()
        .filter(|v| v.is_present())
        .filter_map(AttributeValue::as_string)
        .map(fold)
        .any(|l| right.iter().any(|r| compare_strings(&l, comparator, r)))
}

fn compare_strings(l: &str, comparator: Comparator, r: &str) -> bool {
    match comparator {
        Comparator::Equal => l == r,
        Comparator::NotEqual => l != r,
        Comparator::StartsWith => l.starts_with(r),
        Comparator::EndsWith => l.ends_with(r),
        Comparator::Contains => l.contains(r),
        Comparator::Greater | Comparator::GreaterEqual | Comparator::Less | Comparator::LessEqual => {
            match (l.parse::<f64>(), r.parse::<f64>()) {
                (Ok(l), Ok(r)) => match comparator {
                    Comparator::Greater => l > r,
                    Comparator::GreaterEqual => l >= r,
                    Comparator::Less => l < r,
                    _ => l <= r,
                },
                _ => false,
            }
        }
        _ => false,
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lit(s: &str) -> AttributeValue<'static> {
        AttributeValue::Literal(s.to_string())
    }

    #[test]
    fn string_comparators() {
        let v = lit("GetForecast");
        assert!(compare(&v, Comparator::Equal, &[lit("GetForecast")], false));
        assert!(!compare(&v, Comparator::Equal, &[lit("getforecast")], false));
        assert!(compare(&v, Comparator::Equal, &[lit("getforecast")], true));
        assert!(compare(&v, Comparator::StartsWith, &[lit("Get")], false));
        assert!(compare(&v, Comparator::EndsWith, &[lit("cast")], false));
        assert!(compare(&v, Comparator::Contains, &[lit("Fore")], false));
        assert!(compare(&v, Comparator::NotEqual, &[lit("Other")], false));
        assert!(compare(&v, Comparator::Equal, &[lit("x"), lit("GetForecast")], false));
    }

    #[test]
    fn numeric_comparators_require_numbers() {
        let n = json!(10);
        let v = AttributeValue::Node(&n);
        assert!(compare(&v, Comparator::Greater, &[lit("9")], false));
        assert!(compare(&v, Comparator::LessEqual, &[lit("10")], false));
        assert!(!compare(&v, Comparator::Less, &[lit("abc")], false));
    }

    #[test]
    fn exists_comparator() {
        assert!(compare(&AttributeValue::Null, Comparator::Exists, &[lit("false")], false));
        assert!(!compare(&AttributeValue::Null, Comparator::Exists, &[lit("true")], false));
        assert!(compare(&lit("x"), Comparator::Exists, &[lit("true")], false));
    }

    #[test]
    fn projections_match_any_element() {
        let tags = json!(["a", "b"]);
        let v = node_property(&tags, "(values)");
        assert!(compare(&v, Comparator::Equal, &[lit("b")], false));
        assert!(!compare(&v, Comparator::Equal, &[lit("c")], false));
        assert!(compare(&v, Comparator::Subset, &[lit("a"), lit("b"), lit("c")], false));
        assert!(compare(&v, Comparator::ProperSubset, &[lit("a"), lit("b"), lit("c")], false));
        assert!(!compare(&v, Comparator::ProperSubset, &[lit("a"), lit("b")], false));
        assert!(compare(&v, Comparator::SetEqual, &[lit("b"), lit("a")], false));
        assert!(compare(&v, Comparator::SetNotEqual, &[lit("a")], false));
    }

    #[test]
    fn node_properties() {
        let node = json!({"method": "GET", "uri": "/x", "list": [1, 2, 3]});
        assert_eq!(node_property(&node, "method").as_string().as_deref(), Some("GET"));
        assert_eq!(node_property(&node, "(length)").as_string().as_deref(), Some("3"));
        let list = node_property(&node, "list");
        let AttributeValue::Node(list) = list else { panic!("expected node") };
        assert_eq!(node_property(list, "(length)").as_string().as_deref(), Some("3"));
        assert_eq!(node_property(list, "1").as_string().as_deref(), Some("2"));
        assert!(!node_property(&node, "missing").is_present());
        assert!(!AttributeValue::Node(&Value::Null).is_present());
    }

    #[test]
    fn relative_trait_ids_resolve_to_prelude() {
        assert_eq!(trait_id("required").unwrap().to_string(), "smithy.api#required");
        assert_eq!(trait_id("aws.iam#conditionKeys").unwrap().name(), "conditionKeys");
    }
}
