//! Route table and dispatch.
//!
//! Routes bind a [`Selector`] (HTTP method or upgrade tag) and a path
//! [`Pattern`] to a [`Handler`]. The table is built during setup and read
//! without locking while requests are dispatched.

pub mod dispatcher;
pub mod pattern;
pub mod table;

pub use dispatcher::{Dispatch, Dispatcher, Inbound};
pub use pattern::{Params, Pattern, RouteError};
pub use table::{Handler, Route, RouteMatch, Router, Selector};
