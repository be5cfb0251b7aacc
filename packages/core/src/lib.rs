//! Semantic model engine for a shape-based interface definition language.
//!
//! Front ends hand the engine normalized [`Fragment`]s. The
//! [`ModelAssembler`] merges them with the built-in prelude into an
//! immutable [`Model`], and the [`ValidationEngine`] checks the model
//! against the language's structural and semantic rules.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`shape_id`] | Absolute shape identifiers: [`ShapeId`] |
//! | [`types`] | Shape data: [`Shape`], [`ShapeKind`], [`ShapeType`] |
//! | [`relationship`] | Typed edges between shapes and the reverse index |
//! | [`graph`] | The shape arena: [`ShapeGraph`] |
//! | [`traits`] | Applied traits, definitions and merge rules: [`TraitIndex`] |
//! | [`selector`] | The selector language: [`Selector`] |
//! | [`fragment`] | The input contract for front ends |
//! | [`prelude`] | Built-in shapes and trait definitions |
//! | [`assembler`] | Fragment merging and name resolution |
//! | [`model`] | The assembled [`Model`] and its cached knowledge |
//! | [`knowledge`] | Derived indexes: top-down, identifiers, condition keys, auth, pagination |
//! | [`node_validation`] | Checking trait values against their shapes |
//! | [`validation`] | Validation rules and the engine that runs them |
//! | [`config`] | Environment-driven [`EngineConfig`] |
//! | [`render`] | Plain-text rendering of reports |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use shapegraph::{ModelAssembler, Selector};
//!
//! let mut assembler = ModelAssembler::new();
//! assembler.add_json(r#"{
//!     "namespace": "example",
//!     "shapes": {"NotFound": {"type": "structure", "traits": {"error": "client"}}}
//! }"#)?;
//! let validated = assembler.assemble()?;
//! assert!(validated.is_valid());
//!
//! let errors = Selector::parse("structure[trait|error]")?.select(&validated.model);
//! assert_eq!(errors.len(), 1);
//! ```

pub mod assembler;
pub mod config;
pub mod fragment;
pub mod graph;
pub mod knowledge;
pub mod model;
pub mod node_validation;
pub mod prelude;
pub mod relationship;
pub mod render;
pub mod selector;
pub mod shape_id;
pub mod traits;
pub mod types;
pub mod validation;

pub use assembler::{AssemblyError, MergedModel, ModelAssembler, ValidatedModel};
pub use config::EngineConfig;
pub use fragment::{Fragment, MemberDef, ShapeDef};
pub use graph::ShapeGraph;
pub use model::Model;
pub use relationship::{Relationship, RelationshipType};
pub use selector::{Selector, SelectorSyntaxError};
pub use shape_id::{ShapeId, ShapeIdError};
pub use traits::{TraitDefinition, TraitError, TraitIndex};
pub use types::{Shape, ShapeKind, ShapeType};
pub use validation::{Severity, ValidationEngine, ValidationReport, Validator, Violation, ViolationKind};
