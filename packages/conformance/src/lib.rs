//! Fixture runner for the shapegraph conformance suite.
//!
//! A fixture is a JSON file holding fragments and the exact set of
//! violations assembling them must produce:
//!
//! ```json
//! {
//!   "description": "readonly put",
//!   "fragments": [{"namespace": "ns", "shapes": {}}],
//!   "events": [
//!     {"severity": "ERROR", "kind": "ResourceLifecycle", "shape": "ns#Forecast", "contains": "readonly"}
//!   ]
//! }
//! ```
//!
//! [`run_case`] assembles and validates the fragments, then requires a
//! one-to-one match between expected events and reported violations.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shapegraph::{Fragment, ModelAssembler, Severity, ShapeId, Violation, ViolationKind};
use thiserror::Error;

/// Errors returned while loading or running a fixture.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model could not be assembled: {0}")]
    Assembly(#[from] shapegraph::AssemblyError),

    #[error("{0}")]
    Mismatch(Mismatch),
}

/// One expected violation. `contains`, when set, must be a substring of the
/// reported message.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedEvent {
    pub severity: Severity,
    pub kind: ViolationKind,
    #[serde(default)]
    pub shape: Option<ShapeId>,
    #[serde(default)]
    pub contains: Option<String>,
}

impl ExpectedEvent {
    pub fn matches(&self, violation: &Violation) -> bool {
        self.severity == violation.severity
            && self.kind == violation.kind
            && self.shape == violation.shape_id
            && self
                .contains
                .as_deref()
                .map_or(true, |needle| violation.message.contains(needle))
    }
}

impl fmt::Display for ExpectedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ", self.severity, self.kind)?;
        match &self.shape {
            Some(shape) => write!(f, "on {}", shape)?,
            None => f.write_str("on the model")?,
        }
        if let Some(needle) = &self.contains {
            write!(f, " containing {:?}", needle)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub description: String,
    pub fragments: Vec<Fragment>,
    #[serde(default)]
    pub events: Vec<ExpectedEvent>,
}

/// Expected events nothing matched, and violations no event accounted for.
#[derive(Debug, Default)]
pub struct Mismatch {
    pub missing: Vec<ExpectedEvent>,
    pub unexpected: Vec<Violation>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "reported violations do not match the fixture")?;
        for event in &self.missing {
            writeln!(f, "  missing:    {}", event)?;
        }
        for violation in &self.unexpected {
            writeln!(f, "  unexpected: {}", violation)?;
        }
        Ok(())
    }
}

/// The directory holding the bundled fixtures.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Every `*.json` fixture in `dir`, sorted by file name.
pub fn fixture_paths(dir: &Path) -> Result<Vec<PathBuf>, CaseError> {
    let io = |source| CaseError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

pub fn load_fixture(path: &Path) -> Result<Fixture, CaseError> {
    let json = fs::read_to_string(path).map_err(|source| CaseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| CaseError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Assemble and validate the fixture, then match the report against its
/// events. Each event consumes at most one violation and vice versa.
pub fn run_case(fixture: &Fixture) -> Result<(), CaseError> {
    let mut assembler = ModelAssembler::new();
    for fragment in &fixture.fragments {
        assembler.add_fragment(fragment.clone());
    }
    let validated = assembler.assemble()?;

    let mut unexpected: Vec<Violation> = validated.report.into_violations();
    let mut missing = Vec::new();
    for event in &fixture.events {
        match unexpected.iter().position(|v| event.matches(v)) {
            Some(index) => {
                unexpected.remove(index);
            }
            None => missing.push(event.clone()),
        }
    }

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(CaseError::Mismatch(Mismatch { missing, unexpected }))
    }
}

/// Load and run one fixture file.
pub fn run_file(path: &Path) -> Result<(), CaseError> {
    run_case(&load_fixture(path)?)
}

// --- tests -------------------------------------------------------------------
