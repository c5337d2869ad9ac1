//! Error types shared across the runtime and routing layers.

use std::fmt;

use crate::router::RouteError;
use crate::uri::UriError;

/// Errors surfaced by the runtime, the URI parser and route registration.
#[derive(Debug)]
pub enum Error {
    /// The input matched neither URI grammar (maps to 400 Bad Request).
    BadRequest(UriError),
    /// A route pattern could not be registered.
    Route(RouteError),
    /// A listening endpoint could not be bound.
    Bind(std::io::Error),
    /// A reactor thread or runtime could not be created.
    Exhausted(std::io::Error),
    /// The target runtime or task has already been stopped.
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadRequest(e) => write!(f, "bad request: {}", e),
            Error::Route(e) => write!(f, "route registration failed: {}", e),
            Error::Bind(e) => write!(f, "failed to bind endpoint: {}", e),
            Error::Exhausted(e) => write!(f, "failed to create execution context: {}", e),
            Error::Stopped => f.write_str("runtime stopped"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::BadRequest(e) => Some(e),
            Error::Route(e) => Some(e),
            Error::Bind(e) => Some(e),
            Error::Exhausted(e) => Some(e),
            Error::Stopped => None,
        }
    }
}

impl From<UriError> for Error {
    fn from(e: UriError) -> Self {
        Error::BadRequest(e)
    }
}

impl From<RouteError> for Error {
    fn from(e: RouteError) -> Self {
        Error::Route(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Exhausted(e)
    }
}
