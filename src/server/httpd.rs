use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::http::reply::Reply;
use crate::router::{Dispatcher, Inbound, RouteError, Router, Selector};
use crate::runtime::Service;
use crate::server::endpoint::Endpoint;
use crate::server::listener::{self, Server};

/// An HTTP server: a route table plus the endpoints serving it.
///
/// Register routes first, then serve. Each endpoint takes a snapshot of the
/// table; routes registered afterwards only reach endpoints served later.
///
/// ```no_run
/// # use spindle::config::RuntimeConfig;
/// # use spindle::http::{Method, TEXT_PLAIN};
/// # use spindle::server::{Endpoint, Httpd};
/// # use spindle::Service;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = Service::new(RuntimeConfig::default());
/// let mut httpd = Httpd::new(service.clone());
///
/// httpd.route(Method::GET).segment("hello").to(|_req, _body, mut reply| {
///     reply.content_type(TEXT_PLAIN).write("Hello, world!");
/// })?;
///
/// let server = httpd.serve(&Endpoint::tcp("127.0.0.1", 8080)?)?;
/// # Ok(())
/// # }
/// ```
pub struct Httpd {
    service: Service,
    router: Arc<Router>,
}

/// Route under construction: a selector plus the path segments so far.
pub struct RouteBuilder<'a> {
    httpd: &'a mut Httpd,
    selector: Selector,
    path: String,
}

impl Httpd {
    pub fn new(service: Service) -> Self {
        Self {
            service,
            router: Arc::new(Router::new()),
        }
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Starts a route for `selector`; add segments, then bind a handler.
    pub fn route(&mut self, selector: impl Into<Selector>) -> RouteBuilder<'_> {
        RouteBuilder {
            httpd: self,
            selector: selector.into(),
            path: String::new(),
        }
    }

    /// Binds `handler` to `selector` and `pattern`. Registering the same
    /// pair again replaces the handler.
    pub fn register_route<F>(
        &mut self,
        selector: impl Into<Selector>,
        pattern: &str,
        handler: F,
    ) -> std::result::Result<(), RouteError>
    where
        F: Fn(&Inbound<'_>, &Bytes, Reply) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.router).register(selector, pattern, handler)
    }

    /// Dispatcher over the current route table.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.router.clone())
    }

    /// Binds `endpoint` and serves the current routes on the main reactor.
    ///
    /// The returned server reports the bound endpoint, including the real
    /// port when binding port 0.
    pub fn serve(&self, endpoint: &Endpoint) -> Result<Arc<Server>> {
        listener::serve(&self.service, endpoint, self.dispatcher())
    }
}

impl RouteBuilder<'_> {
    /// Appends one path segment (a literal, `:name` or `*`).
    pub fn segment(mut self, segment: &str) -> Self {
        self.path.push('/');
        self.path.push_str(segment.trim_matches('/'));
        self
    }

    /// Appends a multi-segment path.
    pub fn path(mut self, path: &str) -> Self {
        self.path.push('/');
        self.path.push_str(path);
        self
    }

    /// Completes the registration.
    pub fn to<F>(self, handler: F) -> std::result::Result<(), RouteError>
    where
        F: Fn(&Inbound<'_>, &Bytes, Reply) + Send + Sync + 'static,
    {
        let RouteBuilder {
            httpd,
            selector,
            path,
        } = self;
        httpd.register_route(selector, &path, handler)
    }
}
