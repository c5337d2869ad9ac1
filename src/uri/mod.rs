//! Request-target and URL parsing.
//!
//! A raw string is first matched against the full grammar
//! `scheme://host[:port][/path][?query]`, then against the path-only grammar
//! `/path[?query]`. Input matching neither is rejected as a bad request;
//! nothing is guessed or truncated.
//!
//! Omitted parts take the defaults `http`, `localhost` and `80`.
//!
//! ```
//! # use spindle::uri::Uri;
//! let uri = Uri::parse("/foo/bar?x=1&x=2").unwrap();
//! assert_eq!(uri.host(), "localhost");
//! assert_eq!(uri.port(), 80);
//! assert_eq!(uri.path(), "/foo/bar");
//! ```

mod attributes;

pub use attributes::Attributes;

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 80;

/// Input that matched neither URI grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriError {
    input: String,
    reason: &'static str,
}

impl UriError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed uri {:?}: {}", self.input, self.reason)
    }
}

impl std::error::Error for UriError {}

/// Parsed request target or client URL. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    scheme: String,
    host: String,
    port: u16,
    path: String,
    attributes: Attributes,
}

struct Target<'a> {
    path: &'a str,
    query: Option<&'a str>,
}

impl Uri {
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let full_reason = match parse_full(input) {
            Ok(uri) => return Ok(uri),
            Err(reason) => reason,
        };

        parse_path_only(input).map_err(|path_reason| {
            // Report whichever grammar the input was aiming for.
            let reason = if input.contains("://") {
                full_reason
            } else {
                path_reason
            };
            UriError::new(input, reason)
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Normalized path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// `host:port`, suitable for socket address resolution.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path plus re-encoded query, as written on a request line.
    pub fn path_and_query(&self) -> String {
        if self.attributes.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.attributes.to_query())
        }
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}{}",
            self.scheme,
            self.host,
            self.port,
            self.path_and_query()
        )
    }
}

fn parse_full(input: &str) -> Result<Uri, &'static str> {
    let (scheme, rest) = input
        .split_once("://")
        .ok_or("missing scheme separator")?;

    if !valid_scheme(scheme) {
        return Err("invalid scheme");
    }

    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    let (host, port) = split_authority(authority)?;

    let target = split_target(tail)?;
    if !target.path.is_empty() && !target.path.starts_with('/') {
        return Err("path must start with '/'");
    }

    Ok(Uri {
        scheme: scheme.to_ascii_lowercase(),
        host: host.to_string(),
        port: port.unwrap_or(DEFAULT_PORT),
        path: normalize_path(target.path),
        attributes: target.query.map(Attributes::from_query).unwrap_or_default(),
    })
}

fn parse_path_only(input: &str) -> Result<Uri, &'static str> {
    if !input.starts_with('/') {
        return Err("expected absolute path");
    }

    let target = split_target(input)?;

    Ok(Uri {
        scheme: DEFAULT_SCHEME.to_string(),
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_PORT,
        path: normalize_path(target.path),
        attributes: target.query.map(Attributes::from_query).unwrap_or_default(),
    })
}

fn valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn split_authority(authority: &str) -> Result<(&str, Option<u16>), &'static str> {
    if authority.is_empty() {
        return Err("missing host");
    }

    let (host, port) = if authority.starts_with('[') {
        // IPv6 literal, brackets kept so the host stays resolvable as-is
        let close = authority.find(']').ok_or("unterminated ipv6 literal")?;
        let (host, rest) = authority.split_at(close + 1);
        match rest {
            "" => (host, None),
            _ => (host, Some(rest.strip_prefix(':').ok_or("invalid authority")?)),
        }
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() || host.len() == 2 && host.starts_with('[') {
        return Err("missing host");
    }
    if host.chars().any(|c| c.is_whitespace() || c.is_control() || matches!(c, '@' | '#')) {
        return Err("invalid host");
    }

    let port = match port {
        None => None,
        Some(p) if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => {
            Some(p.parse::<u16>().map_err(|_| "port out of range")?)
        }
        Some(_) => return Err("invalid port"),
    };

    Ok((host, port))
}

fn split_target(tail: &str) -> Result<Target<'_>, &'static str> {
    if tail.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("whitespace in target");
    }
    if tail.contains('#') {
        return Err("fragment in target");
    }

    Ok(match tail.split_once('?') {
        Some((path, query)) => Target {
            path,
            query: Some(query),
        },
        None => Target {
            path: tail,
            query: None,
        },
    })
}

/// Collapses repeated slashes, forces a leading slash and drops a trailing
/// one. Empty input becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }

    if out.is_empty() {
        out.push('/');
    }
    out
}
