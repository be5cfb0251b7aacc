//! Merges fragments into a [`Model`].
//!
//! The prelude is merged first, then user fragments in the order they were
//! added. Relative shape IDs resolve with a fixed precedence: names imported
//! with `use`, then shapes defined in the fragment's own namespace, then
//! prelude shapes. Anything else stays in the fragment's namespace and
//! surfaces later as `ShapeNotFound`.
//!
//! Problems that leave no sensible model to validate are returned as an
//! [`AssemblyError`]. Everything else (conflicting shapes, conflicting trait
//! values, unknown traits) becomes a [`Violation`] on the merged model.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::fragment::{Fragment, MemberDef, ShapeDef, TraitMap};
use crate::graph::ShapeGraph;
use crate::knowledge::top_down::resource_cycle;
use crate::model::Model;
use crate::prelude;
use crate::shape_id::{ShapeId, ShapeIdError, PRELUDE_NAMESPACE};
use crate::traits::{TraitDefinition, TraitError, TraitIndex, TRAIT_TRAIT};
use crate::types::{OperationData, ResourceData, ServiceData, Shape, ShapeKind, ShapeType};
use crate::validation::{
    Severity, ValidationEngine, ValidationReport, Validator, Violation, ViolationKind,
};

/// Problems that abort assembly.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("malformed fragment JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid shape ID `{id}`: {source}")]
    InvalidShapeId {
        id: String,
        #[source]
        source: ShapeIdError,
    },

    #[error("relative shape ID `{0}` found in a fragment with no namespace")]
    MissingNamespace(String),

    #[error("shape `{shape}` defines properties its type does not allow: {}", properties.join(", "))]
    UnexpectedProperties {
        shape: ShapeId,
        properties: Vec<&'static str>,
    },

    #[error("{shape_type} shape `{shape}` requires a `{property}` member")]
    MissingMember {
        shape: ShapeId,
        shape_type: ShapeType,
        property: &'static str,
    },

    #[error("shape `{0}` cannot be defined as a standalone member")]
    StandaloneMember(ShapeId),

    #[error("cannot apply traits to `{0}` because no fragment defines it")]
    ApplyToUndefined(ShapeId),

    #[error("resource containment cycle: {}", format_path(.0))]
    ResourceCycle(Vec<ShapeId>),
}

fn format_path(path: &[ShapeId]) -> String {
    path.iter()
        .map(ShapeId::to_string)
        .collect::<Vec<_>>()
        .join(" > ")
}

/// The merged model together with the problems found while merging.
#[derive(Debug)]
pub struct MergedModel {
    pub model: Model,
    pub violations: Vec<Violation>,
}

/// A merged model and its full validation report. The report includes the
/// violations found while merging.
#[derive(Debug)]
pub struct ValidatedModel {
    pub model: Model,
    pub report: ValidationReport,
}

impl ValidatedModel {
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }
}

/// Collects fragments and turns them into a [`Model`].
///
/// ```rust,ignore
/// let mut assembler = ModelAssembler::new();
/// assembler.add_json(r#"{"namespace": "ns", "shapes": {"A": {"type": "string"}}}"#)?;
/// let validated = assembler.assemble()?;
/// assert!(validated.is_valid());
/// ```
pub struct ModelAssembler {
    config: EngineConfig,
    fragments: Vec<Fragment>,
    validators: Vec<Box<dyn Validator>>,
    include_prelude: bool,
}

impl Default for ModelAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelAssembler {
    /// An assembler with the default config and the prelude included.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            fragments: Vec::new(),
            validators: Vec::new(),
            include_prelude: true,
        }
    }

    pub fn add_fragment(&mut self, fragment: Fragment) -> &mut Self {
        self.fragments.push(fragment);
        self
    }

    /// Add every fragment in a JSON document holding one fragment or an
    /// array of them.
    pub fn add_json(&mut self, json: &str) -> Result<&mut Self, AssemblyError> {
        self.fragments.extend(Fragment::parse_many(json)?);
        Ok(self)
    }

    /// Run `validator` alongside the built-in rules in [`assemble`](Self::assemble).
    pub fn add_validator(&mut self, validator: Box<dyn Validator>) -> &mut Self {
        self.validators.push(validator);
        self
    }

    /// Merge without the prelude. Only useful for tests of the merge itself.
    pub fn disable_prelude(&mut self) -> &mut Self {
        self.include_prelude = false;
        self
    }

    /// Merge every fragment into a model without running validation.
    pub fn merge(self) -> Result<MergedModel, AssemblyError> {
        self.merge_fragments()
    }

    /// Merge, then run the validation engine over the result.
    pub fn assemble(self) -> Result<ValidatedModel, AssemblyError> {
        let MergedModel { model, violations } = self.merge_fragments()?;

        let mut engine = ValidationEngine::new(self.config);
        for validator in self.validators {
            engine.add_validator(validator);
        }
        let mut found = violations;
        found.extend(engine.validate(&model).into_violations());
        Ok(ValidatedModel {
            model,
            report: ValidationReport::new(found),
        })
    }

    fn inputs(&self) -> impl Iterator<Item = (&Fragment, bool)> {
        let prelude: &[Fragment] = if self.include_prelude {
            prelude::fragments()
        } else {
            &[]
        };
        prelude
            .iter()
            .map(|f| (f, true))
            .chain(self.fragments.iter().map(|f| (f, false)))
    }

    fn merge_fragments(&self) -> Result<MergedModel, AssemblyError> {
        let mut violations = Vec::new();

        let mut defined = HashSet::new();
        for (fragment, _) in self.inputs() {
            for name in fragment.shapes.keys() {
                defined.insert(Scope::definition_id(fragment, name)?);
            }
        }

        let mut scopes = Vec::new();
        let mut metadata: IndexMap<String, Value> = IndexMap::new();
        let mut graph = ShapeGraph::new();
        let mut pending: Vec<PendingTrait> = Vec::new();

        for (index, (fragment, from_prelude)) in self.inputs().enumerate() {
            tracing::debug!(
                namespace = fragment.namespace.as_deref().unwrap_or(""),
                shapes = fragment.shapes.len(),
                prelude = from_prelude,
                "merging fragment"
            );
            let scope = Scope::new(fragment, &defined, from_prelude)?;
            merge_metadata(&mut metadata, &fragment.metadata, &mut violations);

            for (name, def) in &fragment.shapes {
                let id = Scope::definition_id(fragment, name)?;
                let (shape, traits) = build_shape(&scope, id, def)?;
                for (target, map) in traits {
                    pending.extend(scope.pending(index, &target, map)?);
                }
                graph.insert(shape);
            }
            for (raw, map) in &fragment.apply {
                let target = scope.resolve(raw)?;
                pending.extend(scope.pending(index, &target, map)?);
            }
            scopes.push(scope);
        }

        // Members only a rejected duplicate defines; their traits are dropped.
        let mut orphaned: HashSet<ShapeId> = HashSet::new();
        for duplicate in graph.take_duplicates() {
            let Some(existing) = graph.get(&duplicate.id) else {
                continue;
            };
            if !existing.is_compatible_with(&duplicate) {
                orphaned.extend(
                    duplicate
                        .members
                        .values()
                        .filter(|m| !graph.contains(&m.id))
                        .map(|m| m.id.clone()),
                );
                violations.push(Violation::error(
                    ViolationKind::ShapeConflict,
                    &duplicate.id,
                    format!(
                        "Conflicting shape definition for `{}` found: the existing {} definition is not identical to the new {} definition",
                        duplicate.id,
                        existing.shape_type(),
                        duplicate.shape_type()
                    ),
                ));
            }
        }

        if !orphaned.is_empty() {
            pending.retain(|t| {
                let keep = !orphaned.contains(&t.shape);
                if !keep {
                    tracing::debug!(shape = %t.shape, trait_id = %t.trait_id, "dropping trait of a conflicting definition");
                }
                keep
            });
        }

        for trait_ in &pending {
            if !graph.contains(&trait_.shape) {
                return Err(AssemblyError::ApplyToUndefined(trait_.shape.clone()));
            }
        }

        let id_refs: HashSet<ShapeId> = pending
            .iter()
            .filter(|t| t.trait_id == ShapeId::prelude("idRef"))
            .map(|t| t.shape.clone())
            .collect();
        for trait_ in &mut pending {
            if let Some(trait_shape) = graph.get(&trait_.trait_id) {
                resolve_id_refs(&graph, &id_refs, &scopes[trait_.scope], trait_shape, &mut trait_.value, 0);
            }
        }

        let traits = apply_traits(&graph, pending, &self.config, &mut violations);

        if let Some(cycle) = resource_cycle(&graph) {
            return Err(AssemblyError::ResourceCycle(cycle));
        }

        tracing::debug!(
            shapes = graph.len(),
            violations = violations.len(),
            "merge finished"
        );
        Ok(MergedModel {
            model: Model::new(graph, traits, metadata),
            violations,
        })
    }
}

impl std::fmt::Debug for ModelAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAssembler")
            .field("config", &self.config)
            .field("fragments", &self.fragments.len())
            .field("validators", &self.validators.len())
            .field("include_prelude", &self.include_prelude)
            .finish()
    }
}

/// Name resolution context for one fragment.
struct Scope<'a> {
    namespace: Option<&'a str>,
    imports: HashMap<String, ShapeId>,
    defined: &'a HashSet<ShapeId>,
    from_prelude: bool,
}

impl<'a> Scope<'a> {
    fn new(
        fragment: &'a Fragment,
        defined: &'a HashSet<ShapeId>,
        from_prelude: bool,
    ) -> Result<Self, AssemblyError> {
        let mut imports = HashMap::new();
        for raw in &fragment.imports {
            let id: ShapeId = raw.parse().map_err(|source| AssemblyError::InvalidShapeId {
                id: raw.clone(),
                source,
            })?;
            imports.insert(id.name().to_string(), id);
        }
        Ok(Self {
            namespace: fragment.namespace.as_deref(),
            imports,
            defined,
            from_prelude,
        })
    }

    /// The ID a `shapes` entry defines. Definitions always live in the
    /// fragment's namespace unless written absolutely.
    fn definition_id(fragment: &Fragment, name: &str) -> Result<ShapeId, AssemblyError> {
        let id = match (fragment.namespace.as_deref(), name.contains('#')) {
            (_, true) => name.parse(),
            (Some(ns), false) => ShapeId::from_optional_namespace(ns, name),
            (None, false) => return Err(AssemblyError::MissingNamespace(name.to_string())),
        };
        id.map_err(|source| AssemblyError::InvalidShapeId {
            id: name.to_string(),
            source,
        })
    }

    fn resolve(&self, raw: &str) -> Result<ShapeId, AssemblyError> {
        let invalid = |source| AssemblyError::InvalidShapeId {
            id: raw.to_string(),
            source,
        };
        if raw.contains('#') {
            return raw.parse().map_err(invalid);
        }
        let (name, member) = match raw.split_once('$') {
            Some((name, member)) => (name, Some(member)),
            None => (raw, None),
        };

        let root = if let Some(imported) = self.imports.get(name) {
            imported.clone()
        } else {
            let local = match self.namespace {
                Some(ns) => Some(ShapeId::from_parts(ns, name, None).map_err(invalid)?),
                None => None,
            };
            let prelude = ShapeId::from_parts(PRELUDE_NAMESPACE, name, None).map_err(invalid)?;
            match local {
                Some(local) if self.defined.contains(&local) => local,
                _ if self.defined.contains(&prelude) => prelude,
                Some(local) => local,
                None => return Err(AssemblyError::MissingNamespace(raw.to_string())),
            }
        };
        match member {
            Some(member) => root.with_member(member).map_err(invalid),
            None => Ok(root),
        }
    }

    fn resolve_all(&self, raw: &[String]) -> Result<Vec<ShapeId>, AssemblyError> {
        raw.iter().map(|r| self.resolve(r)).collect()
    }

    fn resolve_opt(&self, raw: &Option<String>) -> Result<Option<ShapeId>, AssemblyError> {
        raw.as_deref().map(|r| self.resolve(r)).transpose()
    }

    fn pending(
        &self,
        scope: usize,
        shape: &ShapeId,
        traits: &TraitMap,
    ) -> Result<Vec<PendingTrait>, AssemblyError> {
        traits
            .iter()
            .map(|(raw, value)| {
                Ok::<_, AssemblyError>(PendingTrait {
                    shape: shape.clone(),
                    trait_id: self.resolve(raw)?,
                    value: value.clone(),
                    scope,
                    from_prelude: self.from_prelude,
                })
            })
            .collect()
    }
}

/// A trait waiting to be applied once every shape is known.
struct PendingTrait {
    shape: ShapeId,
    trait_id: ShapeId,
    value: Value,
    /// Index of the fragment scope the value was written in.
    scope: usize,
    from_prelude: bool,
}

fn merge_metadata(
    merged: &mut IndexMap<String, Value>,
    incoming: &IndexMap<String, Value>,
    violations: &mut Vec<Violation>,
) {
    for (key, value) in incoming {
        let Some(existing) = merged.get_mut(key) else {
            merged.insert(key.clone(), value.clone());
            continue;
        };
        if existing == value {
            continue;
        }
        match (existing, value) {
            (Value::Array(current), Value::Array(extra)) => current.extend(extra.iter().cloned()),
            (existing, value) => violations.push(Violation::new(
                ViolationKind::MetadataConflict,
                Severity::Error,
                None,
                format!(
                    "Metadata conflict for key `{}`: {} conflicts with {}",
                    key, existing, value
                ),
            )),
        }
    }
}

/// Build the shape for `def` and collect the trait maps of the shape and
/// its members.
fn build_shape<'d>(
    scope: &Scope<'_>,
    id: ShapeId,
    def: &'d ShapeDef,
) -> Result<(Shape, Vec<(ShapeId, &'d TraitMap)>), AssemblyError> {
    let unexpected = def.unexpected_properties();
    if !unexpected.is_empty() {
        return Err(AssemblyError::UnexpectedProperties {
            shape: id,
            properties: unexpected,
        });
    }

    let kind = match def.shape_type {
        ShapeType::Member => return Err(AssemblyError::StandaloneMember(id)),
        ShapeType::Service => ShapeKind::Service(ServiceData {
            version: def.version.clone().unwrap_or_default(),
            operations: scope.resolve_all(&def.operations)?,
            resources: scope.resolve_all(&def.resources)?,
            errors: scope.resolve_all(&def.errors)?,
        }),
        ShapeType::Resource => {
            let mut identifiers = IndexMap::new();
            for (name, target) in &def.identifiers {
                identifiers.insert(name.clone(), scope.resolve(target)?);
            }
            ShapeKind::Resource(ResourceData {
                identifiers,
                create: scope.resolve_opt(&def.create)?,
                put: scope.resolve_opt(&def.put)?,
                read: scope.resolve_opt(&def.read)?,
                update: scope.resolve_opt(&def.update)?,
                delete: scope.resolve_opt(&def.delete)?,
                list: scope.resolve_opt(&def.list)?,
                operations: scope.resolve_all(&def.operations)?,
                collection_operations: scope.resolve_all(&def.collection_operations)?,
                resources: scope.resolve_all(&def.resources)?,
            })
        }
        ShapeType::Operation => ShapeKind::Operation(OperationData {
            input: scope.resolve_opt(&def.input)?,
            output: scope.resolve_opt(&def.output)?,
            errors: scope.resolve_all(&def.errors)?,
        }),
        other => ShapeKind::plain(other).ok_or_else(|| AssemblyError::StandaloneMember(id.clone()))?,
    };

    let missing = |property| AssemblyError::MissingMember {
        shape: id.clone(),
        shape_type: def.shape_type,
        property,
    };
    let members: Vec<(&str, &MemberDef)> = match def.shape_type {
        ShapeType::List | ShapeType::Set => {
            vec![("member", def.member.as_ref().ok_or_else(|| missing("member"))?)]
        }
        ShapeType::Map => vec![
            ("key", def.key.as_ref().ok_or_else(|| missing("key"))?),
            ("value", def.value.as_ref().ok_or_else(|| missing("value"))?),
        ],
        _ => def.members.iter().map(|(n, m)| (n.as_str(), m)).collect(),
    };

    let mut traits = vec![(id.clone(), &def.traits)];
    let mut shape = Shape::new(id, kind);
    for (name, member) in members {
        let member_id = shape
            .id
            .with_member(name)
            .map_err(|source| AssemblyError::InvalidShapeId {
                id: format!("{}${}", shape.id, name),
                source,
            })?;
        let target = scope.resolve(&member.target)?;
        traits.push((member_id.clone(), &member.traits));
        shape.members.insert(name.to_string(), Shape::member(member_id, target));
    }
    Ok((shape, traits))
}

/// Rewrite relative IDs in `value` wherever the trait shape marks a string
/// with `@idRef`. Unresolvable strings are left for the node validator.
fn resolve_id_refs(
    graph: &ShapeGraph,
    id_refs: &HashSet<ShapeId>,
    scope: &Scope<'_>,
    shape: &Shape,
    value: &mut Value,
    depth: usize,
) {
    if depth > 64 {
        return;
    }
    let (target, is_ref) = match shape.target() {
        Some(target) => (
            graph.get(target),
            id_refs.contains(&shape.id) || id_refs.contains(target),
        ),
        None => (Some(shape), id_refs.contains(&shape.id)),
    };
    let Some(target) = target else {
        return;
    };

    let walk = |member: &Shape, value: &mut Value| {
        resolve_id_refs(graph, id_refs, scope, member, value, depth + 1)
    };
    match (target.shape_type(), value) {
        (ShapeType::String, Value::String(s)) if is_ref && !s.contains('#') => {
            if let Ok(id) = scope.resolve(s) {
                *s = id.to_string();
            }
        }
        (ShapeType::List | ShapeType::Set, Value::Array(items)) => {
            if let Some(member) = target.members.get("member") {
                for item in items {
                    walk(member, item);
                }
            }
        }
        (ShapeType::Map, Value::Object(entries)) => {
            if let Some(member) = target.members.get("value") {
                for item in entries.values_mut() {
                    walk(member, item);
                }
            }
        }
        (ShapeType::Structure | ShapeType::Union, Value::Object(entries)) => {
            for (name, item) in entries.iter_mut() {
                if let Some(member) = target.members.get(name) {
                    walk(member, item);
                }
            }
        }
        _ => {}
    }
}

/// Apply trait definitions first so every later application sees the full
/// set of definitions, then everything else in input order.
fn apply_traits(
    graph: &ShapeGraph,
    pending: Vec<PendingTrait>,
    config: &EngineConfig,
    violations: &mut Vec<Violation>,
) -> TraitIndex {
    let mut index = TraitIndex::new();
    let trait_trait: ShapeId = TRAIT_TRAIT.parse().unwrap_or_else(|_| ShapeId::prelude("trait"));
    let (definitions, rest): (Vec<_>, Vec<_>) =
        pending.into_iter().partition(|t| t.trait_id == trait_trait);

    for t in definitions {
        if let Some(shape) = graph.get(&t.shape) {
            index.register_definition(TraitDefinition::from_node(
                t.shape.clone(),
                shape.shape_type(),
                &t.value,
            ));
        }
        record(index.apply(&t.shape, &t.trait_id, t.value), violations);
    }

    for t in rest {
        if !t.from_prelude && t.shape.namespace() == PRELUDE_NAMESPACE {
            violations.push(Violation::error(
                ViolationKind::TraitPlacement,
                &t.shape,
                format!(
                    "Cannot apply the `{}` trait to `{}`: shapes in the `{}` namespace cannot be modified",
                    t.trait_id, t.shape, PRELUDE_NAMESPACE
                ),
            ));
            continue;
        }
        if index.trait_definition(&t.trait_id).is_none() {
            let message = format!(
                "Unable to resolve trait `{}`. If this is a custom trait, then it must be defined before it can be used in a model.",
                t.trait_id
            );
            if !config.allow_unknown_traits {
                violations.push(Violation::error(ViolationKind::ShapeNotFound, &t.shape, message));
                continue;
            }
            violations.push(Violation::warning(ViolationKind::ShapeNotFound, &t.shape, message));
        }
        record(index.apply(&t.shape, &t.trait_id, t.value), violations);
    }
    index
}

fn record(result: Result<(), TraitError>, violations: &mut Vec<Violation>) {
    let Err(err) = result else {
        return;
    };
    let (kind, shape) = match &err {
        TraitError::Conflict { shape, .. } => (ViolationKind::TraitConflict, shape),
        TraitError::Conflicting { shape, .. } => (ViolationKind::ConflictingTrait, shape),
    };
    violations.push(Violation::error(kind, shape, err.to_string()));
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> ShapeId {
        s.parse().unwrap()
    }

    fn fragment(value: Value) -> Fragment {
        serde_json::from_value(value).unwrap()
    }

    fn merge(fragments: Vec<Value>) -> MergedModel {
        let mut assembler = ModelAssembler::new();
        for f in fragments {
            assembler.add_fragment(fragment(f));
        }
        assembler.merge().unwrap()
    }

    fn merge_err(fragments: Vec<Value>) -> AssemblyError {
        let mut assembler = ModelAssembler::new();
        for f in fragments {
            assembler.add_fragment(fragment(f));
        }
        assembler.merge().unwrap_err()
    }

    fn target_of(merged: &MergedModel, member: &str) -> ShapeId {
        merged.model.get_shape(&id(member)).unwrap().target().unwrap().clone()
    }

    #[test]
    fn relative_ids_prefer_imports_then_namespace_then_prelude() {
        let merged = merge(vec![
            json!({"namespace": "other", "shapes": {"String": {"type": "string"}, "Thing": {"type": "string"}}}),
            json!({
                "namespace": "ns",
                "use": ["other#Thing"],
                "shapes": {
                    "Thing": {"type": "integer"},
                    "Blob": {"type": "string"},
                    "S": {"type": "structure", "members": {
                        "a": {"target": "Thing"},
                        "b": {"target": "Blob"},
                        "c": {"target": "String"},
                        "d": {"target": "Missing"}
                    }}
                }
            }),
        ]);
        assert_eq!(target_of(&merged, "ns#S$a"), id("other#Thing"));
        assert_eq!(target_of(&merged, "ns#S$b"), id("ns#Blob"));
        assert_eq!(target_of(&merged, "ns#S$c"), id("smithy.api#String"));
        assert_eq!(target_of(&merged, "ns#S$d"), id("ns#Missing"));
    }

    #[test]
    fn compatible_duplicates_merge_silently() {
        let def = json!({"namespace": "ns", "shapes": {"A": {"type": "structure", "members": {"x": {"target": "String"}}}}});
        let merged = merge(vec![def.clone(), def]);
        assert!(merged.violations.is_empty(), "{:#?}", merged.violations);
        assert_eq!(merged.model.get_shape(&id("ns#A")).unwrap().members.len(), 1);
    }

    #[test]
    fn incompatible_duplicates_keep_the_first_definition() {
        let merged = merge(vec![
            json!({"namespace": "ns", "shapes": {"A": {"type": "string"}}}),
            json!({"namespace": "ns", "shapes": {"A": {"type": "integer"}}}),
        ]);
        assert_eq!(merged.violations.len(), 1);
        assert_eq!(merged.violations[0].kind, ViolationKind::ShapeConflict);
        assert_eq!(
            merged.model.get_shape(&id("ns#A")).unwrap().shape_type(),
            ShapeType::String
        );
    }

    #[test]
    fn member_traits_of_a_rejected_definition_are_dropped() {
        let merged = merge(vec![
            json!({"namespace": "ns", "shapes": {"A": {"type": "structure", "members": {"x": {"target": "String"}}}}}),
            json!({"namespace": "ns", "shapes": {"A": {"type": "structure", "members": {
                "y": {"target": "String", "traits": {"required": {}}}
            }}}}),
        ]);
        assert_eq!(merged.violations.len(), 1, "{:#?}", merged.violations);
        assert_eq!(merged.violations[0].kind, ViolationKind::ShapeConflict);
        assert!(merged.model.get_shape(&id("ns#A$y")).is_none());
        assert!(merged.model.get_shape(&id("ns#A$x")).is_some());

        let merged = merge(vec![
            json!({"namespace": "ns", "shapes": {"A": {"type": "string"}}}),
            json!({"namespace": "ns", "shapes": {"A": {"type": "list", "member": {
                "target": "String", "traits": {"length": {"min": 1}}
            }}}}),
        ]);
        assert_eq!(merged.violations.len(), 1, "{:#?}", merged.violations);
        assert_eq!(merged.violations[0].kind, ViolationKind::ShapeConflict);
    }

    #[test]
    fn metadata_arrays_concatenate_and_scalars_conflict() {
        let merged = merge(vec![
            json!({"metadata": {"list": ["a"], "same": 1, "diff": "x"}}),
            json!({"metadata": {"list": ["b"], "same": 1, "diff": "y"}}),
        ]);
        assert_eq!(merged.model.metadata()["list"], json!(["a", "b"]));
        assert_eq!(merged.violations.len(), 1);
        assert_eq!(merged.violations[0].kind, ViolationKind::MetadataConflict);
        assert_eq!(merged.violations[0].shape_id, None);
    }

    #[test]
    fn inline_and_applied_traits_merge() {
        let merged = merge(vec![
            json!({"namespace": "ns", "shapes": {"A": {"type": "string", "traits": {"tags": ["a", "b"]}}}}),
            json!({"namespace": "ns", "apply": {"A": {"tags": ["b", "c"], "documentation": "doc"}}}),
            json!({"namespace": "ns", "apply": {"A": {"documentation": "doc"}}}),
        ]);
        assert!(merged.violations.is_empty(), "{:#?}", merged.violations);
        let traits = merged.model.traits();
        assert_eq!(traits.get_prelude(&id("ns#A"), "tags"), Some(&json!(["a", "b", "b", "c"])));
        assert_eq!(traits.get_prelude(&id("ns#A"), "documentation"), Some(&json!("doc")));
    }

    #[test]
    fn differing_scalar_traits_conflict() {
        let merged = merge(vec![
            json!({"namespace": "ns", "shapes": {"A": {"type": "string", "traits": {"documentation": "one"}}}}),
            json!({"namespace": "ns", "apply": {"A": {"documentation": "two"}}}),
        ]);
        assert_eq!(merged.violations.len(), 1);
        assert_eq!(merged.violations[0].kind, ViolationKind::TraitConflict);
    }

    #[test]
    fn declared_trait_conflicts_are_reported() {
        let merged = merge(vec![json!({
            "namespace": "ns",
            "shapes": {"Op": {"type": "operation", "traits": {"readonly": {}, "idempotent": {}}}}
        })]);
        assert_eq!(merged.violations.len(), 1);
        assert_eq!(merged.violations[0].kind, ViolationKind::ConflictingTrait);
    }

    #[test]
    fn custom_trait_definitions_resolve_relative_conflicts() {
        let merged = merge(vec![json!({
            "namespace": "ns",
            "shapes": {
                "alpha": {"type": "structure", "traits": {"trait": {"conflicts": ["beta"]}}},
                "beta": {"type": "structure", "traits": {"trait": {}}},
                "A": {"type": "string", "traits": {"beta": {}, "alpha": {}}}
            }
        })]);
        let definition = merged.model.traits().trait_definition(&id("ns#alpha")).unwrap();
        assert_eq!(definition.conflicts, vec![id("ns#beta")]);
        assert_eq!(merged.violations.len(), 1);
        assert_eq!(merged.violations[0].kind, ViolationKind::ConflictingTrait);
    }

    #[test]
    fn unknown_traits_are_errors_unless_allowed() {
        let input = json!({"namespace": "ns", "shapes": {"A": {"type": "string", "traits": {"nope": {}}}}});
        let merged = merge(vec![input.clone()]);
        assert_eq!(merged.violations.len(), 1);
        assert_eq!(merged.violations[0].kind, ViolationKind::ShapeNotFound);
        assert_eq!(merged.violations[0].severity, Severity::Error);
        assert!(!merged.model.traits().has(&id("ns#A"), &id("ns#nope")));

        let mut assembler = ModelAssembler::with_config(EngineConfig {
            allow_unknown_traits: true,
            ..EngineConfig::default()
        });
        assembler.add_fragment(fragment(input));
        let merged = assembler.merge().unwrap();
        assert_eq!(merged.violations[0].severity, Severity::Warning);
        assert!(merged.model.traits().has(&id("ns#A"), &id("ns#nope")));
    }

    #[test]
    fn prelude_shapes_cannot_be_modified() {
        let merged = merge(vec![json!({"namespace": "ns", "apply": {"String": {"documentation": "no"}}})]);
        assert_eq!(merged.violations.len(), 1);
        assert_eq!(merged.violations[0].kind, ViolationKind::TraitPlacement);
        assert_eq!(merged.violations[0].shape_id, Some(id("smithy.api#String")));
    }

    #[test]
    fn unrecoverable_inputs_abort() {
        let err = merge_err(vec![json!({"namespace": "ns", "shapes": {"L": {"type": "list"}}})]);
        assert!(matches!(err, AssemblyError::MissingMember { property: "member", .. }));

        let err = merge_err(vec![json!({"namespace": "ns", "apply": {"Nope": {"documentation": "x"}}})]);
        assert!(matches!(err, AssemblyError::ApplyToUndefined(ref s) if *s == id("ns#Nope")));

        let err = merge_err(vec![json!({"namespace": "ns", "shapes": {"S": {"type": "string", "version": "1"}}})]);
        assert!(matches!(err, AssemblyError::UnexpectedProperties { .. }));

        let err = merge_err(vec![json!({"namespace": "ns", "shapes": {"S": {"type": "structure", "members": {"a b": {"target": "String"}}}}})]);
        assert!(matches!(err, AssemblyError::InvalidShapeId { .. }));

        let err = merge_err(vec![json!({"shapes": {"S": {"type": "string"}}})]);
        assert!(matches!(err, AssemblyError::MissingNamespace(_)));

        let err = merge_err(vec![json!({"namespace": "ns", "shapes": {
            "A": {"type": "resource", "resources": ["B"]},
            "B": {"type": "resource", "resources": ["A"]}
        }})]);
        assert!(matches!(err, AssemblyError::ResourceCycle(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut assembler = ModelAssembler::new();
        assert!(matches!(assembler.add_json("{"), Err(AssemblyError::Json(_))));
    }

    #[test]
    fn assemble_includes_merge_violations_in_the_report() {
        let mut assembler = ModelAssembler::new();
        assembler
            .add_json(r#"{"namespace": "ns", "shapes": {"A": {"type": "string", "traits": {"nope": {}}}}}"#)
            .unwrap();
        let validated = assembler.assemble().unwrap();
        assert!(!validated.is_valid());
        assert_eq!(validated.report.of_kind(ViolationKind::ShapeNotFound).count(), 1);
    }

    #[test]
    fn prelude_alone_assembles_cleanly() {
        let validated = ModelAssembler::new().assemble().unwrap();
        assert!(validated.report.is_empty(), "{:#?}", validated.report);
    }

    #[test]
    fn disabled_prelude_leaves_names_in_the_fragment_namespace() {
        let mut assembler = ModelAssembler::new();
        assembler.disable_prelude();
        assembler.add_fragment(fragment(json!({"namespace": "ns", "shapes": {
            "S": {"type": "structure", "members": {"a": {"target": "String"}}}
        }})));
        let merged = assembler.merge().unwrap();
        assert_eq!(target_of(&merged, "ns#S$a"), id("ns#String"));
        assert!(merged.model.get_shape(&ShapeId::prelude("String")).is_none());
    }
}
