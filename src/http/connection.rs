use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, warn};

use crate::http::parser::{ParseError, parse_http_request};
use crate::http::reply::Reply;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::router::{Dispatch, Dispatcher};

pub struct Connection<S> {
    stream: S,
    dispatcher: Dispatcher,
    buffer: Vec<u8>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, dispatcher: Dispatcher) -> Self {
        Self {
            stream,
            dispatcher,
            buffer: Vec::with_capacity(4096),
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => match self.read_request().await? {
                    Some(req) => {
                        self.state = ConnectionState::Processing(req);
                    }
                    None => {
                        self.state = ConnectionState::Closed;
                    }
                },

                ConnectionState::Processing(req) => {
                    let (response, keep_alive) = Self::handle_request(&self.dispatcher, req).await;

                    let writer = ResponseWriter::new(&response);
                    self.state = ConnectionState::Writing(writer, keep_alive);
                }

                ConnectionState::Writing(writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if *keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reads until one full request is buffered.
    ///
    /// Returns `None` when the peer closes, or after answering a malformed
    /// request with 400.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<Request>> {
        loop {
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.drain(..consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => {
                    warn!(error = %e, "malformed request");
                    let mut response = Response::bad_request();
                    response
                        .headers
                        .insert("Connection".to_string(), "close".to_string());
                    ResponseWriter::new(&response)
                        .write_to_stream(&mut self.stream)
                        .await?;
                    return Ok(None);
                }
            }

            let mut temp = [0u8; 4096];
            let n = self.stream.read(&mut temp).await?;

            if n == 0 {
                if !self.buffer.is_empty() {
                    debug!(pending = self.buffer.len(), "peer closed mid-request");
                }
                return Ok(None);
            }

            self.buffer.extend_from_slice(&temp[..n]);
        }
    }

    async fn handle_request(dispatcher: &Dispatcher, req: &Request) -> (Response, bool) {
        let keep_alive = req.keep_alive();
        let (reply, completion) = Reply::channel();

        let mut response = match dispatcher.dispatch(req, &req.body, reply) {
            // The handler, or whatever it handed the reply to, completes it.
            Dispatch::Dispatched => completion.await.unwrap_or_else(|_| Response::internal_error()),
            Dispatch::NotFound(_) => Response::not_found(),
            Dispatch::BadRequest(_, _) => Response::bad_request(),
        };

        if !keep_alive {
            response
                .headers
                .insert("Connection".to_string(), "close".to_string());
        }

        (response, keep_alive)
    }
}
