//! `@http` routes: URI syntax, label bindings and ambiguous routes.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::knowledge::UriPattern;
use crate::model::Model;
use crate::shape_id::ShapeId;
use crate::types::{Shape, ShapeType};
use crate::validation::{Validator, Violation, ViolationKind};

/// An operation's `@http` binding, with its URI parsed.
struct Route<'m> {
    operation: &'m ShapeId,
    method: &'m str,
    host_prefix: Option<&'m str>,
    uri: UriPattern,
}

impl<'m> Route<'m> {
    /// `None` when the operation has no usable `@http` trait. Malformed URIs
    /// are reported by [`HttpBindingValidator`].
    fn of(model: &'m Model, operation: &'m ShapeId) -> Option<Self> {
        let http = model.traits().get_prelude(operation, "http")?;
        let method = http.get("method").and_then(Value::as_str)?;
        let uri = http.get("uri").and_then(Value::as_str)?.parse::<UriPattern>().ok()?;
        let host_prefix = model
            .traits()
            .get_prelude(operation, "endpoint")
            .and_then(|endpoint| endpoint.get("hostPrefix"))
            .and_then(Value::as_str);
        Some(Self {
            operation,
            method,
            host_prefix,
            uri,
        })
    }
}

/// Two operations of one service must not be reachable by the same request.
pub struct HttpUriConflictValidator;

impl Validator for HttpUriConflictValidator {
    fn name(&self) -> &'static str {
        "HttpUriConflict"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();
        for service in model.graph().root_shapes().filter(|s| s.as_service().is_some()) {
            let routes: Vec<Route> = model
                .top_down()
                .contained_operations(&service.id)
                .iter()
                .filter_map(|op| Route::of(model, op))
                .collect();

            for (i, route) in routes.iter().enumerate() {
                for other in &routes[i + 1..] {
                    if route.method != other.method
                        || route.host_prefix != other.host_prefix
                        || !route.uri.conflicts_with(&other.uri)
                    {
                        continue;
                    }
                    violations.push(Violation::error(
                        ViolationKind::RouteConflict,
                        route.operation,
                        format!(
                            "Operation URI of `{}`, `{} {}`, conflicts with other operation URIs in the same service: [`{}` ({} {})]",
                            route.operation, route.method, route.uri, other.operation, other.method, other.uri
                        ),
                    ));
                }
            }
        }
        violations
    }
}

/// URI labels and `@httpLabel` input members correspond one to one.
pub struct HttpBindingValidator;

impl Validator for HttpBindingValidator {
    fn name(&self) -> &'static str {
        "HttpBinding"
    }

    fn validate(&self, model: &Model) -> Vec<Violation> {
        let mut violations = Vec::new();
        for operation in model.shapes_of_type(ShapeType::Operation) {
            let Some(http) = model.traits().get_prelude(&operation.id, "http") else {
                continue;
            };
            // Missing or mistyped properties are reported by the trait value rule.
            let Some(uri) = http.get("uri").and_then(Value::as_str) else {
                continue;
            };
            let pattern = match UriPattern::parse(uri) {
                Ok(pattern) => pattern,
                Err(err) => {
                    violations.push(Violation::error(
                        ViolationKind::HttpBinding,
                        &operation.id,
                        format!("Invalid `http` trait URI: {}", err),
                    ));
                    continue;
                }
            };
            check_labels(model, operation, &pattern, &mut violations);
        }
        violations
    }
}

fn check_labels(model: &Model, operation: &Shape, pattern: &UriPattern, violations: &mut Vec<Violation>) {
    let input = operation
        .as_operation()
        .and_then(|op| op.input.as_ref())
        .and_then(|id| model.get_shape(id));

    let label_members: BTreeSet<&str> = input
        .map(|input| {
            input
                .members
                .iter()
                .filter(|(_, m)| model.traits().has_prelude(&m.id, "httpLabel"))
                .map(|(name, _)| name.as_str())
                .collect()
        })
        .unwrap_or_default();
    let labels: BTreeSet<&str> = pattern.labels().collect();

    for label in labels.difference(&label_members) {
        violations.push(Violation::error(
            ViolationKind::HttpBinding,
            &operation.id,
            format!(
                "This operation uses `{}` as the URI, but the `{}` label does not have a corresponding input member marked with the `httpLabel` trait",
                pattern, label
            ),
        ));
    }

    let Some(input) = input else {
        return;
    };
    for name in label_members.difference(&labels) {
        let Some(member) = input.members.get(*name) else {
            continue;
        };
        violations.push(Violation::error(
            ViolationKind::HttpBinding,
            &member.id,
            format!(
                "Input member `{}` is marked with the `httpLabel` trait, but no corresponding `http` URI label could be found when used as the input of the `{}` operation.",
                name, operation.id
            ),
        ));
    }

    if let Some(greedy) = pattern.greedy_label() {
        let target = input
            .members
            .get(greedy)
            .and_then(|m| model.resolve_target(&m.id));
        if let Some(target) = target.filter(|t| t.shape_type() != ShapeType::String) {
            violations.push(Violation::error(
                ViolationKind::HttpBinding,
                &operation.id,
                format!(
                    "The `{}` greedy label of `{}` must be bound to a string member, but it targets `{}`",
                    greedy, pattern, target.id
                ),
            ));
        }
    }
}

// --- tests -------------------------------------------------------------------
