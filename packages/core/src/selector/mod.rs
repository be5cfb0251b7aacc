//! The selector query language.
//!
//! A [`Selector`] is compiled once from text and evaluated any number of
//! times against a [`Model`]. Evaluation starts from every shape in the model
//! (members included) and yields the set of shapes the selector reaches.
//!
//! ```text
//! structure[trait|error]                 error structures
//! operation -[input]-> structure         operation inputs
//! service $svc(*) ~> operation           operations in a service closure
//! :test(string, member > string)         strings, and members targeting one
//! ```
//!
//! Syntax errors are reported with the offending position:
//!
//! ```rust,ignore
//! let err = Selector::parse("structure > widget").unwrap_err();
//! assert_eq!(err.column, 13);
//! ```

mod ast;
mod attribute;
mod eval;
mod parser;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::Model;
use crate::shape_id::ShapeId;

use self::eval::{Candidate, Evaluator};

/// A selector failed to compile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Syntax error at line {line}, column {column}: {message}: `{selector}`")]
pub struct SelectorSyntaxError {
    pub message: String,
    pub selector: String,
    /// Character offset into `selector`.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// A compiled selector.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    expr: ast::Expr,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorSyntaxError> {
        Ok(Self {
            source: source.to_string(),
            expr: parser::parse(source)?,
        })
    }

    /// The text this selector was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every shape the selector matches, starting from all shapes.
    pub fn select(&self, model: &Model) -> BTreeSet<ShapeId> {
        let evaluator = Evaluator::new(model);
        let start = evaluator.all_candidates();
        evaluator
            .eval(&self.expr, start)
            .into_iter()
            .map(|c| c.id)
            .collect()
    }

    /// The shapes reached when evaluation starts from `id` alone.
    pub fn select_from(&self, model: &Model, id: &ShapeId) -> BTreeSet<ShapeId> {
        if model.get_shape(id).is_none() {
            return BTreeSet::new();
        }
        let evaluator = Evaluator::new(model);
        let start = vec![Candidate {
            id: id.clone(),
            vars: Default::default(),
        }];
        evaluator
            .eval(&self.expr, start)
            .into_iter()
            .map(|c| c.id)
            .collect()
    }

    /// Whether `id` is in the result of [`select`](Selector::select). Each
    /// call evaluates the whole model; keep the `select` result when checking
    /// many shapes.
    pub fn matches(&self, model: &Model, id: &ShapeId) -> bool {
        self.select(model).contains(id)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Selector {
    type Err = SelectorSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

// --- tests -------------------------------------------------------------------
