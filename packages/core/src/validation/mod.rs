//! Model validation.
//!
//! A [`Validator`] is a pure rule: it reads a [`Model`] and returns the
//! violations it finds. Rules never see each other's output, so the
//! [`ValidationEngine`] is free to run them concurrently on the rayon pool.
//!
//! | Rule | Module |
//! |------|--------|
//! | `ShapeIdConflict` | [`names`] |
//! | `Target` | [`targets`] |
//! | `ShapeRecursion` | [`recursion`] |
//! | `TraitTarget`, `StructurallyExclusive` | [`trait_target`] |
//! | `TraitValue` | [`trait_value`] |
//! | `ResourceIdentifiers` | [`resource`] |
//! | `ResourceLifecycle` | [`lifecycle`] |
//! | `HttpUriConflict`, `HttpBinding` | [`http`] |
//! | `Paginated` | [`paginated`] |
//! | `ConditionKeys` | [`condition_keys`] |
//! | `AuthTrait` | [`auth`] |

pub mod auth;
pub mod condition_keys;
pub mod http;
pub mod lifecycle;
pub mod names;
pub mod paginated;
pub mod recursion;
pub mod resource;
pub mod targets;
pub mod trait_target;
pub mod trait_value;

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::Model;
use crate::shape_id::ShapeId;

/// How bad a violation is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Note,
    Warning,
    Danger,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Note => "NOTE",
            Severity::Warning => "WARNING",
            Severity::Danger => "DANGER",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: `error`, `ERROR` and `Error` all parse.
impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NOTE" => Ok(Severity::Note),
            "WARNING" => Ok(Severity::Warning),
            "DANGER" => Ok(Severity::Danger),
            "ERROR" => Ok(Severity::Error),
            _ => Err(format!(
                "unknown severity {:?}; expected one of: note, warning, danger, error",
                s
            )),
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationKind {
    ShapeNotFound,
    ShapeConflict,
    MetadataConflict,
    TraitConflict,
    ConflictingTrait,
    TraitPlacement,
    SelectorSyntax,
    NodeValueType,
    InvalidTarget,
    RecursiveShape,
    IdentifierBinding,
    ResourceLifecycle,
    RouteConflict,
    HttpBinding,
    Paginated,
    ConditionKey,
    AuthTrait,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::ShapeNotFound => "ShapeNotFound",
            ViolationKind::ShapeConflict => "ShapeConflict",
            ViolationKind::MetadataConflict => "MetadataConflict",
            ViolationKind::TraitConflict => "TraitConflict",
            ViolationKind::ConflictingTrait => "ConflictingTrait",
            ViolationKind::TraitPlacement => "TraitPlacement",
            ViolationKind::SelectorSyntax => "SelectorSyntax",
            ViolationKind::NodeValueType => "NodeValueType",
            ViolationKind::InvalidTarget => "InvalidTarget",
            ViolationKind::RecursiveShape => "RecursiveShape",
            ViolationKind::IdentifierBinding => "IdentifierBinding",
            ViolationKind::ResourceLifecycle => "ResourceLifecycle",
            ViolationKind::RouteConflict => "RouteConflict",
            ViolationKind::HttpBinding => "HttpBinding",
            ViolationKind::Paginated => "Paginated",
            ViolationKind::ConditionKey => "ConditionKey",
            ViolationKind::AuthTrait => "AuthTrait",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem found in a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<ShapeId>,
    pub message: String,
}

impl Violation {
    pub fn new(
        kind: ViolationKind,
        severity: Severity,
        shape_id: Option<ShapeId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            shape_id,
            message: message.into(),
        }
    }

    /// An error-severity violation on `shape`.
    pub fn error(kind: ViolationKind, shape: &ShapeId, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, Some(shape.clone()), message)
    }

    pub fn warning(kind: ViolationKind, shape: &ShapeId, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, Some(shape.clone()), message)
    }

    pub fn danger(kind: ViolationKind, shape: &ShapeId, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Danger, Some(shape.clone()), message)
    }

    fn sort_key(&self) -> (Option<&ShapeId>, ViolationKind, &str) {
        (self.shape_id.as_ref(), self.kind, self.message.as_str())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape_id {
            Some(id) => write!(f, "[{}] {}: {} ({})", self.severity, id, self.message, self.kind),
            None => write!(f, "[{}] {} ({})", self.severity, self.message, self.kind),
        }
    }
}

/// A validation rule.
pub trait Validator: Send + Sync {
    /// Stable rule name, used by `EngineConfig::disabled_rules`.
    fn name(&self) -> &'static str;

    fn validate(&self, model: &Model) -> Vec<Violation>;
}

/// Every violation found for one model, sorted by shape, kind and message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new(mut violations: Vec<Violation>) -> Self {
        violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        violations.dedup();
        Self { violations }
    }

    /// A model is valid when nothing is reported at `Error` severity.
    pub fn is_valid(&self) -> bool {
        !self.violations.iter().any(|v| v.severity == Severity::Error)
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations at `severity` or above.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.severity >= severity)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }

    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

/// Runs a set of [`Validator`]s over a model.
pub struct ValidationEngine {
    validators: Vec<Box<dyn Validator>>,
    config: EngineConfig,
}

impl ValidationEngine {
    /// An engine with every built-in rule that `config` does not disable.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            validators: builtin_validators(),
            config,
        }
    }

    /// An engine with no rules.
    pub fn empty(config: EngineConfig) -> Self {
        Self {
            validators: Vec::new(),
            config,
        }
    }

    pub fn add_validator(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    /// Names of the rules that will run.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.enabled().map(|v| v.name()).collect()
    }

    fn enabled(&self) -> impl Iterator<Item = &Box<dyn Validator>> {
        self.validators
            .iter()
            .filter(|v| self.config.is_enabled(v.name()))
    }

    pub fn validate(&self, model: &Model) -> ValidationReport {
        let rules: Vec<&Box<dyn Validator>> = self.enabled().collect();
        let run = |rule: &&Box<dyn Validator>| {
            let found = rule.validate(model);
            tracing::debug!(rule = rule.name(), violations = found.len(), "rule finished");
            found
        };

        let violations: Vec<Violation> = if self.config.parallel {
            rules.par_iter().flat_map_iter(run).collect()
        } else {
            rules.iter().flat_map(run).collect()
        };

        let report = ValidationReport::new(violations);
        tracing::info!(
            rules = rules.len(),
            violations = report.len(),
            errors = report.count(Severity::Error),
            "validation finished"
        );
        report
    }
}

impl fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("rules", &self.rule_names())
            .field("config", &self.config)
            .finish()
    }
}

/// The built-in rules, in a fixed order.
pub fn builtin_validators() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(names::ShapeIdConflictValidator),
        Box::new(targets::TargetValidator),
        Box::new(recursion::ShapeRecursionValidator),
        Box::new(trait_target::TraitTargetValidator),
        Box::new(trait_target::StructurallyExclusiveValidator),
        Box::new(trait_value::TraitValueValidator),
        Box::new(resource::ResourceIdentifierValidator),
        Box::new(lifecycle::ResourceLifecycleValidator),
        Box::new(http::HttpUriConflictValidator),
        Box::new(http::HttpBindingValidator),
        Box::new(paginated::PaginatedValidator),
        Box::new(condition_keys::ConditionKeysValidator),
        Box::new(auth::AuthTraitValidator),
    ]
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ShapeGraph;
    use crate::traits::TraitIndex;
    use indexmap::IndexMap;

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    struct Fixed(&'static str, Vec<Violation>);

    impl Validator for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn validate(&self, _model: &Model) -> Vec<Violation> {
            self.1.clone()
        }
    }

    fn empty_model() -> Model {
        Model::new(ShapeGraph::new(), TraitIndex::new(), IndexMap::new())
    }

    #[test]
    fn severity_order_and_parsing() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Danger < Severity::Error);
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
        assert!("fatal".parse::<Severity>().is_err());
        assert_eq!(serde_json::to_string(&Severity::Danger).unwrap(), "\"DANGER\"");
    }

    #[test]
    fn report_is_sorted_and_deduplicated() {
        let b = Violation::error(ViolationKind::ShapeNotFound, &id("ns#B"), "b");
        let a = Violation::warning(ViolationKind::Paginated, &id("ns#A"), "a");
        let global = Violation::new(ViolationKind::MetadataConflict, Severity::Error, None, "m");
        let report = ValidationReport::new(vec![b.clone(), a.clone(), b.clone(), global.clone()]);
        assert_eq!(report.violations(), &[global, a, b]);
        assert!(!report.is_valid());
        assert_eq!(report.count(Severity::Error), 2);
        assert_eq!(report.at_least(Severity::Warning).count(), 3);
    }

    #[test]
    fn warnings_alone_keep_a_model_valid() {
        let report = ValidationReport::new(vec![Violation::warning(
            ViolationKind::Paginated,
            &id("ns#A"),
            "a",
        )]);
        assert!(report.is_valid());
    }

    #[test]
    fn engine_skips_disabled_rules_and_runs_in_parallel() {
        let mut config = EngineConfig::default();
        config.disabled_rules.insert("Off".into());
        let mut engine = ValidationEngine::empty(config);
        engine.add_validator(Box::new(Fixed(
            "On",
            vec![Violation::error(ViolationKind::ShapeNotFound, &id("ns#A"), "x")],
        )));
        engine.add_validator(Box::new(Fixed(
            "Off",
            vec![Violation::error(ViolationKind::ShapeNotFound, &id("ns#B"), "y")],
        )));
        assert_eq!(engine.rule_names(), vec!["On"]);
        let report = engine.validate(&empty_model());
        assert_eq!(report.len(), 1);
        assert_eq!(report.violations()[0].shape_id, Some(id("ns#A")));
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let model = empty_model();
        let build = |parallel| {
            let mut engine = ValidationEngine::empty(EngineConfig {
                parallel,
                ..EngineConfig::default()
            });
            for (name, shape) in [("A", "ns#Z"), ("B", "ns#Y"), ("C", "ns#X")] {
                engine.add_validator(Box::new(Fixed(
                    name,
                    vec![Violation::error(ViolationKind::InvalidTarget, &id(shape), name)],
                )));
            }
            engine.validate(&model)
        };
        assert_eq!(build(true), build(false));
    }

    #[test]
    fn builtin_rule_names_are_unique() {
        let mut names: Vec<&str> = builtin_validators().iter().map(|v| v.name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
