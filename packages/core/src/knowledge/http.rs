//! `@http` URI patterns.
//!
//! A pattern is a path of literal and label segments plus an optional query
//! string of literals: `/cities/{cityId}/forecast?detail=full`. A greedy
//! label (`{key+}`) matches one or more segments and must come last.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::shape_id::is_valid_identifier;

/// Errors returned when a URI pattern is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UriPatternError {
    #[error("URI pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("URI pattern `{0}` must not contain a fragment")]
    Fragment(String),

    #[error("URI pattern `{pattern}` has an empty segment at position {position}")]
    EmptySegment { pattern: String, position: usize },

    #[error("URI pattern `{pattern}` has an invalid label segment `{segment}`")]
    InvalidLabel { pattern: String, segment: String },

    #[error("URI pattern `{pattern}` declares label `{label}` more than once")]
    DuplicateLabel { pattern: String, label: String },

    #[error("URI pattern `{0}` has a greedy label that is not the last segment")]
    GreedyNotLast(String),

    #[error("URI pattern `{pattern}` has an invalid query `{query}`")]
    InvalidQuery { pattern: String, query: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Label(String),
    GreedyLabel(String),
}

impl Segment {
    pub fn is_label(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Segment::Label(name) | Segment::GreedyLabel(name) => Some(name),
            Segment::Literal(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(s) => f.write_str(s),
            Segment::Label(s) => write!(f, "{{{}}}", s),
            Segment::GreedyLabel(s) => write!(f, "{{{}+}}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriPattern {
    source: String,
    segments: Vec<Segment>,
    query: BTreeMap<String, String>,
}

impl UriPattern {
    pub fn parse(pattern: &str) -> Result<Self, UriPatternError> {
        if !pattern.starts_with('/') {
            return Err(UriPatternError::MissingLeadingSlash(pattern.to_string()));
        }
        if pattern.contains('#') {
            return Err(UriPatternError::Fragment(pattern.to_string()));
        }

        let (path, query_str) = match pattern.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (pattern, None),
        };

        let mut segments = Vec::new();
        let mut labels: HashSet<String> = HashSet::new();
        let raw = &path[1..];
        if !raw.is_empty() {
            let parts: Vec<&str> = raw.split('/').collect();
            for (position, part) in parts.iter().enumerate() {
                if part.is_empty() {
                    // A single trailing slash is allowed.
                    if position == parts.len() - 1 {
                        break;
                    }
                    return Err(UriPatternError::EmptySegment {
                        pattern: pattern.to_string(),
                        position,
                    });
                }
                let segment = parse_segment(pattern, part)?;
                if let Some(label) = segment.label() {
                    if !labels.insert(label.to_string()) {
                        return Err(UriPatternError::DuplicateLabel {
                            pattern: pattern.to_string(),
                            label: label.to_string(),
                        });
                    }
                }
                segments.push(segment);
            }
        }

        if let Some(greedy) = segments
            .iter()
            .position(|s| matches!(s, Segment::GreedyLabel(_)))
        {
            if greedy != segments.len() - 1 {
                return Err(UriPatternError::GreedyNotLast(pattern.to_string()));
            }
        }

        let mut query = BTreeMap::new();
        if let Some(query_str) = query_str {
            for part in query_str.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                if key.is_empty()
                    || key.contains(['{', '}'])
                    || value.contains(['{', '}'])
                    || query.insert(key.to_string(), value.to_string()).is_some()
                {
                    return Err(UriPatternError::InvalidQuery {
                        pattern: pattern.to_string(),
                        query: part.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            query,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Literal query parameters, by key.
    pub fn query_literals(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Label names in path order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::label)
    }

    pub fn greedy_label(&self) -> Option<&str> {
        self.segments.iter().find_map(|s| match s {
            Segment::GreedyLabel(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Whether a request could match both patterns.
    ///
    /// Query literals must be identical. Segments are compared pairwise: two
    /// literals must be equal, a literal never collides with a label, two
    /// labels keep going, and a greedy label collides with any label. A greedy
    /// label against a literal does not collide. Without a greedy collision
    /// the patterns must also have the same number of segments.
    pub fn conflicts_with(&self, other: &UriPattern) -> bool {
        if self.query != other.query {
            return false;
        }
        for (a, b) in self.segments.iter().zip(&other.segments) {
            match (a, b) {
                (Segment::Literal(x), Segment::Literal(y)) => {
                    if x != y {
                        return false;
                    }
                }
                (Segment::Literal(_), _) | (_, Segment::Literal(_)) => return false,
                (Segment::Label(_), Segment::Label(_)) => {}
                (Segment::GreedyLabel(_), _) | (_, Segment::GreedyLabel(_)) => return true,
            }
        }
        self.segments.len() == other.segments.len()
    }
}

fn parse_segment(pattern: &str, part: &str) -> Result<Segment, UriPatternError> {
    let invalid = || UriPatternError::InvalidLabel {
        pattern: pattern.to_string(),
        segment: part.to_string(),
    };
    if let Some(inner) = part.strip_prefix('{') {
        let inner = inner.strip_suffix('}').ok_or_else(invalid)?;
        let (name, greedy) = match inner.strip_suffix('+') {
            Some(name) => (name, true),
            None => (inner, false),
        };
        if !is_valid_identifier(name) {
            return Err(invalid());
        }
        return Ok(if greedy {
            Segment::GreedyLabel(name.to_string())
        } else {
            Segment::Label(name.to_string())
        });
    }
    if part.contains(['{', '}']) {
        return Err(invalid());
    }
    Ok(Segment::Literal(part.to_string()))
}

impl fmt::Display for UriPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for UriPattern {
    type Err = UriPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UriPattern::parse(s)
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> UriPattern {
        s.parse().unwrap()
    }

    #[test]
    fn parses_segments_labels_and_query() {
        let pattern = p("/cities/{cityId}/files/{key+}?detail=full&flag");
        assert_eq!(pattern.segments().len(), 4);
        assert_eq!(pattern.labels().collect::<Vec<_>>(), vec!["cityId", "key"]);
        assert_eq!(pattern.greedy_label(), Some("key"));
        assert_eq!(pattern.query_literals()["detail"], "full");
        assert_eq!(pattern.query_literals()["flag"], "");
        assert_eq!(pattern.to_string(), "/cities/{cityId}/files/{key+}?detail=full&flag");
        assert!(p("/").segments().is_empty());
        assert_eq!(p("/a/").segments().len(), 1);
    }

    #[test]
    fn rejects_malformed_patterns() {
        for bad in [
            "foo",
            "/a//b",
            "/a/{b",
            "/a/x{b}",
            "/{a}/{a}",
            "/{a+}/b",
            "/{1a}",
            "/a#frag",
            "/a?x={y}",
            "/a?x=1&x=2",
        ] {
            assert!(UriPattern::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn identical_label_patterns_conflict() {
        assert!(p("/foo/{bar}").conflicts_with(&p("/foo/{baz}")));
        assert!(p("/foo").conflicts_with(&p("/foo")));
    }

    #[test]
    fn literals_and_lengths_disambiguate() {
        assert!(!p("/foo/{bar}").conflicts_with(&p("/foo/bar")));
        assert!(!p("/foo/{bar}").conflicts_with(&p("/foo/{bar}/baz")));
        assert!(!p("/foo/a").conflicts_with(&p("/foo/b")));
    }

    #[test]
    fn greedy_labels() {
        assert!(p("/files/{key+}").conflicts_with(&p("/files/{id}")));
        assert!(p("/files/{id}").conflicts_with(&p("/files/{key+}")));
        assert!(!p("/files/{key+}").conflicts_with(&p("/files/static")));
    }

    #[test]
    fn query_literals_must_match() {
        assert!(!p("/foo?a=1").conflicts_with(&p("/foo?a=2")));
        assert!(!p("/foo?a=1").conflicts_with(&p("/foo")));
        assert!(p("/foo?a=1").conflicts_with(&p("/foo?a=1")));
    }
}
