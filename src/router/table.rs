use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::http::reply::Reply;
use crate::http::request::Method;
use crate::router::dispatcher::Inbound;
use crate::router::pattern::{Params, Pattern, RouteError};

/// Route handler: the matched request, its body and the reply sink.
pub type Handler = Arc<dyn Fn(&Inbound<'_>, &Bytes, Reply) + Send + Sync>;

/// What a route is selected by: an HTTP method, or a protocol upgrade
/// request (any request carrying an `Upgrade` header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Method(Method),
    Upgrade,
}

impl From<Method> for Selector {
    fn from(method: Method) -> Self {
        Selector::Method(method)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Method(m) => write!(f, "{}", m),
            Selector::Upgrade => f.write_str("UPGRADE"),
        }
    }
}

#[derive(Clone)]
pub struct Route {
    selector: Selector,
    pattern: Pattern,
    handler: Handler,
}

impl Route {
    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("selector", &self.selector)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Params,
}

/// Ordered route table.
///
/// Resolution filters by selector, then tries patterns in registration
/// order; the first match wins. Registering an identical selector and
/// pattern again swaps the handler in place, keeping the original position.
#[derive(Clone, Default, Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(
        &mut self,
        selector: impl Into<Selector>,
        pattern: &str,
        handler: F,
    ) -> Result<(), RouteError>
    where
        F: Fn(&Inbound<'_>, &Bytes, Reply) + Send + Sync + 'static,
    {
        let pattern = Pattern::parse(pattern)?;
        self.insert(selector.into(), pattern, Arc::new(handler));
        Ok(())
    }

    pub fn insert(&mut self, selector: Selector, pattern: Pattern, handler: Handler) {
        if let Some(route) = self
            .routes
            .iter_mut()
            .find(|r| r.selector == selector && r.pattern == pattern)
        {
            debug!(%selector, pattern = %pattern, "replacing route handler");
            route.handler = handler;
            return;
        }

        info!(%selector, pattern = %pattern, "route registered");
        self.routes.push(Route {
            selector,
            pattern,
            handler,
        });
    }

    /// Finds the first route for `selector` whose pattern matches the
    /// normalized `path`.
    pub fn resolve(&self, selector: Selector, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|route| route.selector == selector)
            .find_map(|route| {
                route
                    .pattern
                    .matches(path)
                    .map(|params| RouteMatch { route, params })
            })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
