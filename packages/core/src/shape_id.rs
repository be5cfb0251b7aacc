//! Shape identifiers.
//!
//! A [`ShapeId`] names a shape absolutely: `namespace#Name` for root shapes
//! and `namespace#Name$member` for members. Relative forms (`Name`,
//! `Name$member`) only exist inside fragments and are resolved by the
//! assembler.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The namespace of the built-in prelude.
pub const PRELUDE_NAMESPACE: &str = "smithy.api";

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Za-z]|_+[A-Za-z0-9])[A-Za-z0-9_]*$").expect("static regex"));

/// Errors returned when a shape ID is syntactically invalid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeIdError {
    #[error("invalid shape ID {0:?}: expected namespace#Name or namespace#Name$member")]
    Malformed(String),

    #[error("invalid namespace {0:?}")]
    InvalidNamespace(String),

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
}

/// An absolute shape identifier.
///
/// Ordering is by namespace, then name, then member (a root shape sorts
/// before its members).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShapeId {
    namespace: String,
    name: String,
    member: Option<String>,
}

impl ShapeId {
    /// Build an ID from already-separated parts, validating each.
    pub fn from_parts(
        namespace: &str,
        name: &str,
        member: Option<&str>,
    ) -> Result<Self, ShapeIdError> {
        if !is_valid_namespace(namespace) {
            return Err(ShapeIdError::InvalidNamespace(namespace.to_string()));
        }
        if !is_valid_identifier(name) {
            return Err(ShapeIdError::InvalidIdentifier(name.to_string()));
        }
        if let Some(m) = member {
            if !is_valid_identifier(m) {
                return Err(ShapeIdError::InvalidIdentifier(m.to_string()));
            }
        }
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            member: member.map(str::to_string),
        })
    }

    /// Resolve `Name` or `Name$member` against `namespace`. Absolute input
    /// (containing `#`) is parsed as-is.
    pub fn from_optional_namespace(namespace: &str, relative: &str) -> Result<Self, ShapeIdError> {
        if relative.contains('#') {
            return relative.parse();
        }
        let (name, member) = split_member(relative)?;
        Self::from_parts(namespace, name, member)
    }

    /// Shorthand for a prelude shape ID. The name is not validated.
    pub fn prelude(name: &str) -> Self {
        Self::unchecked(PRELUDE_NAMESPACE, name)
    }

    /// A root shape ID built from trusted literals.
    pub(crate) fn unchecked(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            member: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    pub fn has_member(&self) -> bool {
        self.member.is_some()
    }

    /// This ID with the given member name.
    pub fn with_member(&self, member: &str) -> Result<Self, ShapeIdError> {
        if !is_valid_identifier(member) {
            return Err(ShapeIdError::InvalidIdentifier(member.to_string()));
        }
        Ok(Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            member: Some(member.to_string()),
        })
    }

    /// The root shape ID (member removed).
    pub fn without_member(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            member: None,
        }
    }

    /// `Name` or `Name$member`, without the namespace.
    pub fn relative(&self) -> String {
        match &self.member {
            Some(m) => format!("{}${}", self.name, m),
            None => self.name.clone(),
        }
    }

    pub fn is_prelude(&self) -> bool {
        self.namespace == PRELUDE_NAMESPACE
    }

    /// Lowercased rendering used to detect IDs that differ only by case.
    pub fn case_key(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(m) => write!(f, "{}#{}${}", self.namespace, self.name, m),
            None => write!(f, "{}#{}", self.namespace, self.name),
        }
    }
}

impl FromStr for ShapeId {
    type Err = ShapeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, rest) = s
            .split_once('#')
            .ok_or_else(|| ShapeIdError::Malformed(s.to_string()))?;
        if rest.contains('#') {
            return Err(ShapeIdError::Malformed(s.to_string()));
        }
        let (name, member) = split_member(rest)?;
        Self::from_parts(namespace, name, member)
    }
}

impl TryFrom<String> for ShapeId {
    type Error = ShapeIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShapeId> for String {
    fn from(id: ShapeId) -> Self {
        id.to_string()
    }
}

/// Whether `s` is a valid identifier (`Foo`, `_foo1`, but not `_` or `1a`).
pub fn is_valid_identifier(s: &str) -> bool {
    IDENTIFIER_RE.is_match(s)
}

/// Whether `s` is a dot-separated sequence of identifiers.
pub fn is_valid_namespace(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_valid_identifier)
}

fn split_member(s: &str) -> Result<(&str, Option<&str>), ShapeIdError> {
    match s.split_once('$') {
        Some((name, member)) => {
            if member.contains('$') {
                return Err(ShapeIdError::Malformed(s.to_string()));
            }
            Ok((name, Some(member)))
        }
        None => Ok((s, None)),
    }
}

// --- tests -------------------------------------------------------------------
