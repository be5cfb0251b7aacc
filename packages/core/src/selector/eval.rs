//! The selector interpreter.
//!
//! Evaluation moves an ordered, deduplicated candidate set through the steps
//! of an [`Expr`]. A candidate is a shape plus the variables bound on the
//! path that reached it, so `$name(...)` and `${name}` see the bindings of
//! their own traversal.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use indexmap::IndexSet;

use super::ast::{Direction, Expr, Neighbor, ScopedAttribute, ScopedValue, Step};
use super::attribute::{compare, AttributeValue};
use crate::model::Model;
use crate::relationship::{Relationship, RelationshipType};
use crate::shape_id::ShapeId;
use crate::types::{Shape, ShapeType};

/// Variable name to the shapes stored under it.
pub(crate) type Vars = BTreeMap<String, BTreeSet<ShapeId>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Candidate {
    pub id: ShapeId,
    pub vars: Rc<Vars>,
}

impl Candidate {
    fn with_vars(id: ShapeId, vars: &Rc<Vars>) -> Self {
        Self {
            id,
            vars: Rc::clone(vars),
        }
    }
}

pub(crate) struct Evaluator<'m> {
    model: &'m Model,
    roots: RefCell<HashMap<usize, Rc<BTreeSet<ShapeId>>>>,
}

impl<'m> Evaluator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            roots: RefCell::new(HashMap::new()),
        }
    }

    /// Every shape in the model, no variables bound.
    pub fn all_candidates(&self) -> Vec<Candidate> {
        let vars = Rc::new(Vars::new());
        self.model
            .graph()
            .all_shapes()
            .map(|s| Candidate::with_vars(s.id.clone(), &vars))
            .collect()
    }

    pub fn eval(&self, expr: &Expr, input: Vec<Candidate>) -> Vec<Candidate> {
        let mut current = input;
        for step in &expr.steps {
            if current.is_empty() {
                break;
            }
            current = self.step(step, current);
        }
        current
    }

    fn eval_one(&self, expr: &Expr, candidate: &Candidate) -> Vec<Candidate> {
        self.eval(expr, vec![candidate.clone()])
    }

    fn step(&self, step: &Step, input: Vec<Candidate>) -> Vec<Candidate> {
        match step {
            Step::Identity => input,
            Step::Type(t) => self.filter(input, |s, _| s.shape_type() == *t),
            Step::Category(c) => self.filter(input, |s, _| c.matches(s.shape_type())),
            Step::Attribute(attr) => self.filter(input, |s, c| {
                let value = self.root_value(s, c, &attr.path);
                match &attr.comparison {
                    None => value.is_present(),
                    Some(cmp) => {
                        let rhs: Vec<AttributeValue<'_>> = cmp
                            .values
                            .iter()
                            .map(|v| AttributeValue::Literal(v.clone()))
                            .collect();
                        compare(&value, cmp.comparator, &rhs, cmp.case_insensitive)
                    }
                }
            }),
            Step::Scoped(scoped) => self.filter(input, |s, c| self.scoped_matches(scoped, s, c)),
            Step::Neighbor(neighbor) => {
                self.expand(input, |c| self.neighbors(neighbor, c))
            }
            Step::RecursiveNeighbor => self.expand(input, |c| self.recursive_neighbors(c)),
            Step::Not(expr) => self.filter(input, |_, c| self.eval_one(expr, c).is_empty()),
            Step::Test(exprs) => self.filter(input, |_, c| {
                exprs.iter().any(|e| !self.eval_one(e, c).is_empty())
            }),
            Step::Is(exprs) => self.expand(input, |c| {
                exprs.iter().flat_map(|e| self.eval_one(e, c)).collect()
            }),
            Step::In(expr) => self.filter(input, |_, c| {
                self.eval_one(expr, c).iter().any(|r| r.id == c.id)
            }),
            Step::Root { index, expr } => {
                let found = self.root(*index, expr);
                self.expand(input, |c| {
                    found
                        .iter()
                        .map(|id| Candidate::with_vars(id.clone(), &c.vars))
                        .collect()
                })
            }
            Step::Recursive(expr) => self.expand(input, |c| self.recursive(expr, c)),
            Step::TopDown {
                qualifier,
                disqualifier,
            } => self.expand(input, |c| {
                let mut out = Vec::new();
                let mut visited = HashSet::new();
                if let Some(shape) = self.model.get_shape(&c.id) {
                    if matches!(
                        shape.shape_type(),
                        ShapeType::Service | ShapeType::Resource | ShapeType::Operation | ShapeType::Member
                    ) {
                        self.top_down(
                            false,
                            &c.id,
                            c,
                            qualifier,
                            disqualifier.as_deref(),
                            &mut visited,
                            &mut out,
                        );
                    }
                }
                out
            }),
            Step::VariableStore { name, expr } => input
                .into_iter()
                .map(|c| {
                    let found: BTreeSet<ShapeId> =
                        self.eval_one(expr, &c).into_iter().map(|r| r.id).collect();
                    let mut vars = (*c.vars).clone();
                    vars.insert(name.clone(), found);
                    Candidate {
                        id: c.id,
                        vars: Rc::new(vars),
                    }
                })
                .collect(),
            Step::VariableGet(name) => self.expand(input, |c| {
                c.vars
                    .get(name)
                    .map(|ids| {
                        ids.iter()
                            .map(|id| Candidate::with_vars(id.clone(), &c.vars))
                            .collect()
                    })
                    .unwrap_or_default()
            }),
            Step::Nothing => Vec::new(),
        }
    }

    // --- combinators -----------------------------------------------------

    fn filter(
        &self,
        input: Vec<Candidate>,
        keep: impl Fn(&'m Shape, &Candidate) -> bool,
    ) -> Vec<Candidate> {
        input
            .into_iter()
            .filter(|c| match self.model.get_shape(&c.id) {
                Some(shape) => keep(shape, c),
                None => false,
            })
            .collect()
    }

    fn expand(
        &self,
        input: Vec<Candidate>,
        f: impl Fn(&Candidate) -> Vec<Candidate>,
    ) -> Vec<Candidate> {
        let mut out: IndexSet<Candidate> = IndexSet::new();
        for c in &input {
            out.extend(f(c));
        }
        out.into_iter().collect()
    }

    // --- attributes ------------------------------------------------------

    fn root_value(&self, shape: &'m Shape, c: &Candidate, path: &[String]) -> AttributeValue<'m> {
        match path.split_first() {
            Some((first, rest)) if first == "var" => {
                AttributeValue::Vars(Rc::clone(&c.vars)).path(rest, self.model)
            }
            _ => AttributeValue::Shape(shape).path(path, self.model),
        }
    }

    fn scoped_matches(&self, scoped: &ScopedAttribute, shape: &'m Shape, c: &Candidate) -> bool {
        let scope = if scoped.path.is_empty() {
            AttributeValue::Shape(shape)
        } else {
            self.root_value(shape, c, &scoped.path)
        };
        let resolve = |value: &ScopedValue, context: &AttributeValue<'m>| match value {
            ScopedValue::Literal(s) => AttributeValue::Literal(s.clone()),
            ScopedValue::Path(path) if path.is_empty() => context.clone(),
            ScopedValue::Path(path) => context.clone().path(path, self.model),
        };
        scope.flatten().into_iter().any(|context| {
            scoped.assertions.iter().all(|assertion| {
                let lhs = resolve(&assertion.lhs, context);
                let rhs: Vec<AttributeValue<'m>> =
                    assertion.rhs.iter().map(|v| resolve(v, context)).collect();
                compare(&lhs, assertion.comparator, &rhs, assertion.case_insensitive)
            })
        })
    }

    // --- traversal -------------------------------------------------------

    fn neighbors(&self, neighbor: &Neighbor, c: &Candidate) -> Vec<Candidate> {
        let accepts = |rel: &Relationship| {
            if neighbor.labels.is_empty() {
                rel.rel != RelationshipType::Trait
            } else {
                rel.rel
                    .selector_label()
                    .is_some_and(|label| neighbor.labels.iter().any(|l| l == label))
            }
        };
        let index = self.model.neighbors();
        match neighbor.direction {
            Direction::Forward => index
                .forward(&c.id)
                .iter()
                .filter(|rel| accepts(rel))
                .filter(|rel| self.model.get_shape(&rel.neighbor).is_some())
                .map(|rel| Candidate::with_vars(rel.neighbor.clone(), &c.vars))
                .collect(),
            Direction::Reverse => index
                .reverse(&c.id)
                .iter()
                .filter(|rel| accepts(rel))
                .map(|rel| Candidate::with_vars(rel.shape.clone(), &c.vars))
                .collect(),
        }
    }

    /// Everything reachable over forward non-trait edges, start excluded.
    fn recursive_neighbors(&self, c: &Candidate) -> Vec<Candidate> {
        let index = self.model.neighbors();
        let mut visited: HashSet<ShapeId> = HashSet::new();
        let mut queue: VecDeque<ShapeId> = VecDeque::new();
        let mut out = Vec::new();
        visited.insert(c.id.clone());
        queue.push_back(c.id.clone());
        while let Some(current) = queue.pop_front() {
            for rel in index.forward(&current) {
                if rel.rel == RelationshipType::Trait || self.model.get_shape(&rel.neighbor).is_none() {
                    continue;
                }
                if visited.insert(rel.neighbor.clone()) {
                    queue.push_back(rel.neighbor.clone());
                    out.push(Candidate::with_vars(rel.neighbor.clone(), &c.vars));
                }
            }
        }
        out
    }

    /// Repeatedly apply `expr`, collecting every shape reached.
    fn recursive(&self, expr: &Expr, c: &Candidate) -> Vec<Candidate> {
        let mut seen: HashSet<ShapeId> = HashSet::new();
        let mut out = Vec::new();
        let mut frontier = vec![c.clone()];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for found in self.eval(expr, frontier) {
                if seen.insert(found.id.clone()) {
                    out.push(found.clone());
                    next.push(found);
                }
            }
            frontier = next;
        }
        out
    }

    fn root(&self, index: usize, expr: &Expr) -> Rc<BTreeSet<ShapeId>> {
        if let Some(found) = self.roots.borrow().get(&index) {
            return Rc::clone(found);
        }
        let found: Rc<BTreeSet<ShapeId>> = Rc::new(
            self.eval(expr, self.all_candidates())
                .into_iter()
                .map(|c| c.id)
                .collect(),
        );
        self.roots.borrow_mut().insert(index, Rc::clone(&found));
        found
    }

    #[allow(clippy::too_many_arguments)]
    fn top_down(
        &self,
        mut qualified: bool,
        id: &ShapeId,
        origin: &Candidate,
        qualifier: &Expr,
        disqualifier: Option<&Expr>,
        visited: &mut HashSet<ShapeId>,
        out: &mut Vec<Candidate>,
    ) {
        if !visited.insert(id.clone()) {
            return;
        }
        let here = Candidate::with_vars(id.clone(), &origin.vars);
        if !qualified && !self.eval_one(qualifier, &here).is_empty() {
            qualified = true;
        }
        if qualified {
            if let Some(d) = disqualifier {
                if !self.eval_one(d, &here).is_empty() {
                    qualified = false;
                }
            }
        }
        if qualified {
            out.push(here);
        }
        for rel in self.model.neighbors().forward(id) {
            if !matches!(rel.rel, RelationshipType::Resource | RelationshipType::Operation)
                || rel.neighbor == *id
                || self.model.get_shape(&rel.neighbor).is_none()
            {
                continue;
            }
            self.top_down(qualified, &rel.neighbor, origin, qualifier, disqualifier, visited, out);
        }
    }
}
