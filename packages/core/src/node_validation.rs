//! Checks a node value against the shape it claims to be.
//!
//! Trait values are stored untyped; this module walks a value alongside the
//! trait's shape and reports every mismatch: wrong node type, unknown or
//! missing structure members, out-of-range numbers, and the constraint
//! traits `enum`, `length`, `range`, `pattern` and `idRef`.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::model::Model;
use crate::selector::Selector;
use crate::shape_id::ShapeId;
use crate::types::{Shape, ShapeType};
use crate::validation::Severity;

/// RFC 3339 date-time, the only string form a timestamp accepts.
static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$")
        .expect("static regex")
});

/// One problem found in a node value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIssue {
    /// Where in the value the problem is, e.g. `.members[0].value`. Empty for
    /// the top-level value.
    pub path: String,
    pub severity: Severity,
    pub message: String,
}

/// Validates values against shapes of one model. Compiled selectors and
/// patterns are cached for the validator's lifetime.
pub struct NodeValidator<'m> {
    model: &'m Model,
    selectors: RefCell<HashMap<String, Option<BTreeSet<ShapeId>>>>,
    patterns: RefCell<HashMap<String, Option<Regex>>>,
}

impl<'m> NodeValidator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            selectors: RefCell::new(HashMap::new()),
            patterns: RefCell::new(HashMap::new()),
        }
    }

    /// Every issue found validating `value` against `shape`. Shapes missing
    /// from the model are not checked.
    pub fn validate(&self, shape: &ShapeId, value: &Value) -> Vec<NodeIssue> {
        let mut issues = Vec::new();
        if let Some(shape) = self.model.get_shape(shape) {
            self.visit(shape, None, value, "", &mut issues);
        }
        issues
    }

    /// `member` is the member that led to `shape`, whose constraint traits
    /// take precedence over the target's.
    fn visit(&self, shape: &Shape, member: Option<&Shape>, value: &Value, path: &str, issues: &mut Vec<NodeIssue>) {
        if let Some(target) = shape.target() {
            if let Some(target_shape) = self.model.get_shape(target) {
                self.visit(target_shape, Some(shape), value, path, issues);
            }
            return;
        }

        let error = |issues: &mut Vec<NodeIssue>, message: String| {
            issues.push(NodeIssue {
                path: path.to_string(),
                severity: Severity::Error,
                message,
            })
        };

        match shape.shape_type() {
            ShapeType::Document => {}
            ShapeType::Boolean => {
                if !value.is_boolean() {
                    error(issues, invalid_shape(shape, "boolean", value));
                }
            }
            ShapeType::String => match value.as_str() {
                Some(s) => self.check_string(shape, member, s, path, issues),
                None => error(issues, invalid_shape(shape, "string", value)),
            },
            ShapeType::Blob => match value.as_str() {
                Some(s) => self.check_length(shape, member, s.len(), path, issues),
                None => error(issues, invalid_shape(shape, "string", value)),
            },
            ShapeType::Timestamp => match value {
                Value::Number(_) => {}
                Value::String(s) if DATE_TIME_RE.is_match(s) => {}
                Value::String(s) => error(issues, format!(
                    "Invalid string value, `{}`, provided for timestamp, `{}`. Expected an RFC 3339 formatted timestamp (e.g., \"1985-04-12T23:20:50.52Z\")",
                    s, shape.id
                )),
                _ => error(issues, invalid_shape(shape, "number", value)),
            },
            t if t.is_integral() => self.check_integral(shape, member, value, path, issues),
            t if t.is_floating() => match value {
                Value::Number(n) => {
                    let n = n.as_f64().unwrap_or(0.0);
                    self.check_range(shape, member, n, path, issues);
                }
                Value::String(s) if t != ShapeType::BigDecimal && is_special_float(s) => {}
                _ => error(issues, invalid_shape(shape, "number", value)),
            },
            ShapeType::List | ShapeType::Set => match value.as_array() {
                Some(items) => {
                    self.check_length(shape, member, items.len(), path, issues);
                    if shape.shape_type() == ShapeType::Set {
                        let mut seen = HashSet::new();
                        let duplicates: BTreeSet<String> = items
                            .iter()
                            .map(Value::to_string)
                            .filter(|item| !seen.insert(item.clone()))
                            .collect();
                        if !duplicates.is_empty() {
                            issues.push(NodeIssue {
                                path: path.to_string(),
                                severity: Severity::Error,
                                message: format!(
                                    "Set values must be unique, but found duplicates: {}",
                                    duplicates.into_iter().collect::<Vec<_>>().join(", ")
                                ),
                            });
                        }
                    }
                    if let Some(element) = shape.members.get("member") {
                        for (i, item) in items.iter().enumerate() {
                            self.visit(element, None, item, &format!("{}[{}]", path, i), issues);
                        }
                    }
                }
                None => error(issues, invalid_shape(shape, "array", value)),
            },
            ShapeType::Map => match value.as_object() {
                Some(entries) => {
                    self.check_length(shape, member, entries.len(), path, issues);
                    for (key, entry) in entries {
                        let entry_path = format!("{}.{}", path, key);
                        if let Some(key_member) = shape.members.get("key") {
                            let key_value = Value::String(key.clone());
                            self.visit(key_member, None, &key_value, &format!("{} (map-key)", entry_path), issues);
                        }
                        if let Some(value_member) = shape.members.get("value") {
                            self.visit(value_member, None, entry, &entry_path, issues);
                        }
                    }
                }
                None => error(issues, invalid_shape(shape, "object", value)),
            },
            ShapeType::Structure => match value.as_object() {
                Some(entries) => self.check_structure(shape, entries, path, issues),
                None => error(issues, invalid_shape(shape, "object", value)),
            },
            ShapeType::Union => match value.as_object() {
                Some(entries) if entries.len() > 1 => {
                    error(issues, "union values can contain a value for only a single member".to_string())
                }
                Some(entries) => {
                    for (key, entry) in entries {
                        match shape.members.get(key) {
                            Some(m) => self.visit(m, None, entry, &format!("{}.{}", path, key), issues),
                            None => issues.push(NodeIssue {
                                path: path.to_string(),
                                severity: Severity::Error,
                                message: format!("Invalid union member `{}` found for `{}`", key, shape.id),
                            }),
                        }
                    }
                }
                None => error(issues, invalid_shape(shape, "object", value)),
            },
            other => error(issues, format!("Encountered invalid shape type: {}", other)),
        }
    }

    fn check_structure(
        &self,
        shape: &Shape,
        entries: &serde_json::Map<String, Value>,
        path: &str,
        issues: &mut Vec<NodeIssue>,
    ) {
        for (key, entry) in entries {
            match shape.members.get(key) {
                Some(m) => self.visit(m, None, entry, &format!("{}.{}", path, key), issues),
                None => issues.push(NodeIssue {
                    path: path.to_string(),
                    severity: Severity::Warning,
                    message: format!("Invalid structure member `{}` found for `{}`", key, shape.id),
                }),
            }
        }
        for (name, m) in &shape.members {
            if self.model.traits().has_prelude(&m.id, "required") && !entries.contains_key(name) {
                issues.push(NodeIssue {
                    path: path.to_string(),
                    severity: Severity::Error,
                    message: format!("Missing required structure member `{}` for `{}`", name, shape.id),
                });
            }
        }
    }

    fn check_integral(&self, shape: &Shape, member: Option<&Shape>, value: &Value, path: &str, issues: &mut Vec<NodeIssue>) {
        let mut error = |message: String| {
            issues.push(NodeIssue {
                path: path.to_string(),
                severity: Severity::Error,
                message,
            })
        };
        let Value::Number(number) = value else {
            error(invalid_shape(shape, "number", value));
            return;
        };
        let shape_type = shape.shape_type();
        if !(number.is_i64() || number.is_u64()) {
            error(format!(
                "{} shapes must not have floating point values, but found `{}` provided for `{}`",
                shape_type, number, shape.id
            ));
            return;
        }
        let bounds = match shape_type {
            ShapeType::Byte => Some((i8::MIN as i64, i8::MAX as i64)),
            ShapeType::Short => Some((i16::MIN as i64, i16::MAX as i64)),
            ShapeType::Integer => Some((i32::MIN as i64, i32::MAX as i64)),
            ShapeType::Long => Some((i64::MIN, i64::MAX)),
            _ => None,
        };
        if let Some((min, max)) = bounds {
            match number.as_i64() {
                Some(n) if n < min => {
                    error(format!("{} value must be > {}, but found {}", shape_type, min, n));
                    return;
                }
                Some(n) if n > max => {
                    error(format!("{} value must be < {}, but found {}", shape_type, max, n));
                    return;
                }
                Some(_) => {}
                None => {
                    error(format!("{} value must be < {}, but found {}", shape_type, max, number));
                    return;
                }
            }
        }
        let n = number.as_f64().unwrap_or(0.0);
        self.check_range(shape, member, n, path, issues);
    }

    fn check_string(&self, shape: &Shape, member: Option<&Shape>, s: &str, path: &str, issues: &mut Vec<NodeIssue>) {
        self.check_length(shape, member, s.chars().count(), path, issues);

        if let Some(values) = self.constraint(shape, member, "enum").and_then(Value::as_array) {
            let allowed: Vec<&str> = values
                .iter()
                .filter_map(|d| d.get("value").and_then(Value::as_str))
                .collect();
            if !allowed.contains(&s) {
                issues.push(self.issue(
                    path,
                    format!(
                        "String value provided for `{}` must be one of the following values: {}",
                        shape.id,
                        allowed
                            .iter()
                            .map(|v| format!("`{}`", v))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                ));
            }
        }

        if let Some(pattern) = self.constraint(shape, member, "pattern").and_then(Value::as_str) {
            if let Some(false) = self.pattern_matches(pattern, s) {
                issues.push(self.issue(
                    path,
                    format!(
                        "String value provided for `{}` must match regular expression: {}",
                        shape.id, pattern
                    ),
                ));
            }
        }

        if let Some(id_ref) = self.constraint(shape, member, "idRef") {
            self.check_id_ref(id_ref, s, path, issues);
        }
    }

    fn check_id_ref(&self, id_ref: &Value, s: &str, path: &str, issues: &mut Vec<NodeIssue>) {
        let custom = id_ref.get("errorMessage").and_then(Value::as_str);
        let fail = |default: String| custom.map(str::to_string).unwrap_or(default);

        let id: ShapeId = match s.parse() {
            Ok(id) => id,
            Err(_) => {
                issues.push(self.issue(path, fail(format!("Invalid shape ID: `{}`", s))));
                return;
            }
        };
        if self.model.get_shape(&id).is_none() {
            if id_ref.get("failWhenMissing").and_then(Value::as_bool) == Some(true) {
                issues.push(self.issue(
                    path,
                    fail(format!("Shape ID `{}` was not found in the model", id)),
                ));
            }
            return;
        }
        if let Some(selector) = id_ref.get("selector").and_then(Value::as_str) {
            if let Some(false) = self.selector_matches(selector, &id) {
                issues.push(self.issue(
                    path,
                    fail(format!(
                        "Shape ID `{}` does not match selector `{}`",
                        id, selector
                    )),
                ));
            }
        }
    }

    fn check_length(&self, shape: &Shape, member: Option<&Shape>, len: usize, path: &str, issues: &mut Vec<NodeIssue>) {
        let Some(length) = self.constraint(shape, member, "length") else {
            return;
        };
        let len = len as f64;
        if let Some(min) = length.get("min").and_then(Value::as_f64) {
            if len < min {
                issues.push(self.issue(
                    path,
                    format!(
                        "Value provided for `{}` must have at least {} elements or characters, but the provided value only has {}",
                        shape.id, min, len
                    ),
                ));
            }
        }
        if let Some(max) = length.get("max").and_then(Value::as_f64) {
            if len > max {
                issues.push(self.issue(
                    path,
                    format!(
                        "Value provided for `{}` must have no more than {} elements or characters, but the provided value has {}",
                        shape.id, max, len
                    ),
                ));
            }
        }
    }

    fn check_range(&self, shape: &Shape, member: Option<&Shape>, n: f64, path: &str, issues: &mut Vec<NodeIssue>) {
        let Some(range) = self.constraint(shape, member, "range") else {
            return;
        };
        if let Some(min) = range.get("min").and_then(Value::as_f64) {
            if n < min {
                issues.push(self.issue(
                    path,
                    format!("Value provided for `{}` must be greater than or equal to {}, but found {}", shape.id, min, n),
                ));
            }
        }
        if let Some(max) = range.get("max").and_then(Value::as_f64) {
            if n > max {
                issues.push(self.issue(
                    path,
                    format!("Value provided for `{}` must be less than or equal to {}, but found {}", shape.id, max, n),
                ));
            }
        }
    }

    /// A prelude constraint trait, from the referring member first.
    fn constraint(&self, shape: &Shape, member: Option<&Shape>, name: &str) -> Option<&'m Value> {
        let traits = self.model.traits();
        member
            .and_then(|m| traits.get_prelude(&m.id, name))
            .or_else(|| traits.get_prelude(&shape.id, name))
    }

    fn issue(&self, path: &str, message: String) -> NodeIssue {
        NodeIssue {
            path: path.to_string(),
            severity: Severity::Error,
            message,
        }
    }

    /// `None` when the pattern does not compile; the trait's own
    /// validation reports that.
    fn pattern_matches(&self, pattern: &str, s: &str) -> Option<bool> {
        let mut cache = self.patterns.borrow_mut();
        let compiled = cache
            .entry(pattern.to_string())
            .or_insert_with(|| Regex::new(pattern).ok());
        compiled.as_ref().map(|re| re.is_match(s))
    }

    /// `None` when the selector does not compile.
    fn selector_matches(&self, selector: &str, id: &ShapeId) -> Option<bool> {
        let mut cache = self.selectors.borrow_mut();
        let matched = cache.entry(selector.to_string()).or_insert_with(|| {
            Selector::parse(selector)
                .ok()
                .map(|compiled| compiled.select(self.model))
        });
        matched.as_ref().map(|set| set.contains(id))
    }
}

fn invalid_shape(shape: &Shape, expected: &str, value: &Value) -> String {
    let mut message = format!(
        "Expected {} value for {} shape, `{}`; found {} value",
        expected,
        shape.shape_type(),
        shape.id,
        node_type(value)
    );
    match value {
        Value::String(s) => message.push_str(&format!(", `{}`", s)),
        Value::Number(n) => message.push_str(&format!(", `{}`", n)),
        Value::Bool(b) => message.push_str(&format!(", `{}`", b)),
        _ => {}
    }
    message
}

fn node_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_special_float(s: &str) -> bool {
    matches!(s, "NaN" | "Infinity" | "-Infinity")
}

// --- tests -------------------------------------------------------------------
