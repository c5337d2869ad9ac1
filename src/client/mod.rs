//! Outbound HTTP client.
//!
//! A request is parsed up front, then exchanged on a pooled [`Task`] so a
//! slow upstream never holds the main reactor. The completion callback runs
//! on that task; the task goes back to the pool once the callback returns,
//! unwinds, or the exchange is abandoned.
//!
//! [`Task`]: crate::runtime::Task

pub mod upstream;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::request::Method;
use crate::http::response::Response;
use crate::runtime::{Service, Task, WeakService};
use crate::uri::Uri;

use upstream::Outbound;

/// Issues outbound requests on the service's task pool.
#[derive(Clone)]
pub struct Client {
    service: Service,
    connect_timeout: Duration,
    request_timeout: Duration,
}

/// A parsed outbound request, ready to send.
pub struct ClientRequest {
    client: Client,
    outbound: Outbound,
}

impl Client {
    pub fn new(service: Service, config: &ClientConfig) -> Self {
        Self {
            service,
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
        }
    }

    /// Starts a request to `url`. Fails with a bad-request error when the
    /// target is not a valid URI; nothing is sent in that case.
    pub fn request(&self, method: Method, url: &str) -> Result<ClientRequest> {
        let uri = Uri::parse(url)?;
        Ok(self.prepare(method, uri))
    }

    /// Starts a request to a bound address, e.g. a server on port 0.
    pub fn request_to(&self, method: Method, addr: SocketAddr, path: &str) -> Result<ClientRequest> {
        let url = format!("http://{}{}", addr, path);
        self.request(method, &url)
    }

    fn prepare(&self, method: Method, uri: Uri) -> ClientRequest {
        ClientRequest {
            client: self.clone(),
            outbound: Outbound {
                method,
                uri,
                headers: HashMap::new(),
                body: Bytes::new(),
            },
        }
    }
}

impl ClientRequest {
    pub fn uri(&self) -> &Uri {
        &self.outbound.uri
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outbound.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.outbound.body = body.into();
        self
    }

    /// Sends the request on a pooled task and calls `on_done` there with the
    /// response. Transport failures arrive as a 502 or 504 response.
    ///
    /// Errors only when no task could be obtained or scheduled.
    pub fn send<F>(self, on_done: F) -> Result<()>
    where
        F: FnOnce(&Response, &Bytes) + Send + 'static,
    {
        let ClientRequest { client, outbound } = self;
        let service = client.service.clone();
        let task = service.available_task()?;

        let lease = TaskLease {
            service: service.downgrade(),
            task: task.clone(),
        };
        task.spawn(async move {
            let _lease = lease;
            let response = match client.exchange(&outbound).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(uri = %outbound.uri, error = %e, "outbound request failed");
                    upstream::error_response(&e)
                }
            };
            on_done(&response, &response.body);
        })?;
        Ok(())
    }

    /// Runs the exchange on the caller's runtime and returns the response.
    pub async fn fetch(self) -> anyhow::Result<Response> {
        self.client.exchange(&self.outbound).await
    }
}

/// Hands a borrowed task back to the pool when dropped.
struct TaskLease {
    service: WeakService,
    task: Arc<Task>,
}

impl Drop for TaskLease {
    fn drop(&mut self) {
        if let Some(service) = self.service.upgrade() {
            service.remove_task(&self.task);
        }
    }
}

impl Client {
    async fn exchange(&self, outbound: &Outbound) -> anyhow::Result<Response> {
        debug!(method = %outbound.method, uri = %outbound.uri, "sending request");
        upstream::exchange(outbound, self.connect_timeout, self.request_timeout).await
    }
}
