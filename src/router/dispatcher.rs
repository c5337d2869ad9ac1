use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::http::reply::Reply;
use crate::http::request::{Method, Request};
use crate::router::pattern::Params;
use crate::router::table::{Router, Selector};
use crate::uri::{Attributes, Uri, UriError};

/// The view of a matched request handed to a handler.
pub struct Inbound<'a> {
    request: &'a Request,
    uri: &'a Uri,
    params: &'a Params,
}

impl<'a> Inbound<'a> {
    pub fn request(&self) -> &'a Request {
        self.request
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    pub fn uri(&self) -> &'a Uri {
        self.uri
    }

    pub fn path(&self) -> &'a str {
        self.uri.path()
    }

    /// Value bound to a `:name` (or `*`) pattern segment.
    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &'a Params {
        self.params
    }

    /// First query attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&'a str> {
        self.uri.attributes().get(key)
    }

    pub fn attributes(&self) -> &'a Attributes {
        self.uri.attributes()
    }

    pub fn header(&self, key: &str) -> Option<&'a str> {
        self.request.header(key)
    }
}

/// Outcome of a dispatch. Unhandled replies come back to the transport so it
/// can answer on the wire.
#[derive(Debug)]
pub enum Dispatch {
    /// A handler ran and now owns the reply.
    Dispatched,
    /// No route matched.
    NotFound(Reply),
    /// The request target is not a valid URI.
    BadRequest(Reply, UriError),
}

/// Resolves inbound requests against a route table and runs the handler on
/// the calling thread.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Parses the target, resolves a route and invokes its handler.
    ///
    /// Returns as soon as the handler does; any async work the handler
    /// started keeps the reply until it finishes.
    pub fn dispatch(&self, request: &Request, body: &Bytes, reply: Reply) -> Dispatch {
        let uri = match Uri::parse(&request.target) {
            Ok(uri) => uri,
            Err(e) => {
                debug!(target = %request.target, error = %e, "rejecting malformed target");
                return Dispatch::BadRequest(reply, e);
            }
        };

        let found = if request.is_upgrade() {
            self.router
                .resolve(Selector::Upgrade, uri.path())
                .or_else(|| self.router.resolve(request.method.into(), uri.path()))
        } else {
            self.router.resolve(request.method.into(), uri.path())
        };

        let Some(found) = found else {
            debug!(method = %request.method, path = %uri.path(), "no route");
            return Dispatch::NotFound(reply);
        };

        debug!(
            method = %request.method,
            path = %uri.path(),
            pattern = %found.route.pattern(),
            "dispatching"
        );

        let inbound = Inbound {
            request,
            uri: &uri,
            params: &found.params,
        };
        (found.route.handler())(&inbound, body, reply);

        Dispatch::Dispatched
    }
}
