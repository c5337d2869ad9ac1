//! Spindle - asynchronous HTTP toolkit
//!
//! Core library: the shared runtime (reactor threads, pooled tasks and the
//! object registry), URI parsing, route dispatch and the HTTP glue around them.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod router;
pub mod runtime;
pub mod server;
pub mod uri;

pub use error::{Error, Result};
pub use runtime::{Object, Service, Task, Timer};
