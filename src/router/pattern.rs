use std::fmt;

use crate::uri::normalize_path;

/// Why a path pattern was refused at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A `:` segment without a name.
    EmptyParam(String),
    /// `*` anywhere but the last segment.
    WildcardNotLast(String),
    /// The same parameter name bound twice.
    DuplicateParam(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::EmptyParam(p) => write!(f, "empty parameter name in {:?}", p),
            RouteError::WildcardNotLast(p) => write!(f, "wildcard must be last in {:?}", p),
            RouteError::DuplicateParam(p) => write!(f, "duplicate parameter in {:?}", p),
        }
    }
}

impl std::error::Error for RouteError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A normalized path pattern.
///
/// Segments are literals, `:name` (binds exactly one segment) or a final
/// `*` (binds the remaining segments, possibly none, under the name `*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

/// Parameters bound by a match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Pattern {
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let raw = normalize_path(pattern);
        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();

        for (i, part) in parts.iter().enumerate() {
            let segment = if *part == "*" {
                if i + 1 != parts.len() {
                    return Err(RouteError::WildcardNotLast(raw.clone()));
                }
                Segment::Wildcard
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(RouteError::EmptyParam(raw.clone()));
                }
                if names.contains(&name) {
                    return Err(RouteError::DuplicateParam(raw.clone()));
                }
                names.push(name);
                Segment::Param(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the pattern has no parameters or wildcard.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Matches an already-normalized request path.
    pub fn matches(&self, path: &str) -> Option<Params> {
        if self.is_literal() {
            return (self.raw == path).then(Params::default);
        }

        let mut params = Params::default();
        let mut parts = path.split('/').filter(|s| !s.is_empty());

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    if parts.next()? != lit {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.next()?;
                    params.push(name.clone(), value.to_string());
                }
                Segment::Wildcard => {
                    let rest: Vec<&str> = parts.by_ref().collect();
                    params.push("*", rest.join("/"));
                }
            }
        }

        parts.next().is_none().then_some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Params {
    pub(crate) fn push(&mut self, name: impl Into<String>, value: String) {
        self.pairs.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
