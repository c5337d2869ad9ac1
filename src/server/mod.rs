//! Server side: route registration and listening endpoints.

pub mod endpoint;
pub mod httpd;
pub mod listener;

pub use endpoint::Endpoint;
pub use httpd::{Httpd, RouteBuilder};
pub use listener::Server;
