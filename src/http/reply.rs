use std::collections::HashMap;

use bytes::BytesMut;
use tokio::sync::oneshot;

use crate::http::response::{Response, ResponseBuilder, StatusCode};

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSON: &str = "application/json";

/// Append-style reply sink handed to route handlers.
///
/// The reply completes exactly once: on [`Reply::finish`], or when the
/// value is dropped. A handler that needs more async work before it can
/// answer moves the reply into its continuation; the transport keeps the
/// request open until that continuation lets go of it.
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: BytesMut,
    sink: Option<oneshot::Sender<Response>>,
}

impl Reply {
    pub fn new(sink: oneshot::Sender<Response>) -> Self {
        Self {
            status: StatusCode::Ok,
            headers: HashMap::new(),
            body: BytesMut::new(),
            sink: Some(sink),
        }
    }

    /// A reply plus the receiver that yields its finished response.
    pub fn channel() -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        (Self::new(tx), rx)
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn content_type(&mut self, value: &str) -> &mut Self {
        self.header("Content-Type", value)
    }

    /// Appends to the body.
    pub fn write(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.body.extend_from_slice(data.as_ref());
        self
    }

    /// Body written so far.
    pub fn content(&self) -> &[u8] {
        &self.body
    }

    pub fn current_status(&self) -> StatusCode {
        self.status
    }

    /// Truthy while the status is 2xx.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Completes the reply now.
    pub fn finish(mut self) {
        self.complete();
    }

    fn complete(&mut self) {
        let Some(sink) = self.sink.take() else {
            return;
        };

        let response = ResponseBuilder::new(self.status)
            .headers(std::mem::take(&mut self.headers))
            .body(self.body.split().freeze())
            .build();

        // The transport may already have given up on this request.
        if sink.send(response).is_err() {
            tracing::debug!("reply completed after the requester went away");
        }
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        self.complete();
    }
}
