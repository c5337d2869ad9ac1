//! Outbound HTTP/1.1 exchange.
//!
//! Connects, writes one request with `Connection: close`, and reads the
//! response by Content-Length or until the peer closes.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{error::Elapsed, timeout};

use crate::http::request::Method;
use crate::http::response::{Response, StatusCode};
use crate::uri::Uri;

/// Default buffer size for streaming
const BUFFER_SIZE: usize = 8192;

/// Upper bound on response headers.
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// One outbound request, fully described.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub method: Method,
    pub uri: Uri,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

/// Runs the exchange with separate connect and overall request deadlines.
pub async fn exchange(
    outbound: &Outbound,
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Response> {
    let addr = outbound.uri.authority();
    let stream = timeout(connect_timeout, TcpStream::connect(&addr))
        .await
        .context("connect timeout")?
        .with_context(|| format!("failed to connect to {}", addr))?;

    tracing::trace!(%addr, "connected");

    timeout(request_timeout, send_and_receive(stream, outbound))
        .await
        .context("request timeout")?
}

async fn send_and_receive<S>(mut stream: S, outbound: &Outbound) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request_bytes = build_http_request(outbound);
    stream.write_all(&request_bytes).await?;
    stream.flush().await?;

    read_http_response(&mut stream).await
}

/// Serializes the request line, headers and body.
pub fn build_http_request(outbound: &Outbound) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(256 + outbound.body.len());

    buffer.extend_from_slice(
        format!(
            "{} {} HTTP/1.1\r\n",
            outbound.method,
            outbound.uri.path_and_query()
        )
        .as_bytes(),
    );

    let mut headers = outbound.headers.clone();

    let host = if outbound.uri.port() == crate::uri::DEFAULT_PORT {
        outbound.uri.host().to_string()
    } else {
        outbound.uri.authority()
    };
    headers.insert("Host".to_string(), host);

    // Hop-by-hop headers are ours to decide.
    headers.remove("Keep-Alive");
    headers.remove("Transfer-Encoding");
    headers.insert("Connection".to_string(), "close".to_string());

    if !outbound.body.is_empty() || matches!(outbound.method, Method::POST | Method::PUT) {
        headers.insert("Content-Length".to_string(), outbound.body.len().to_string());
    }

    for (key, value) in &headers {
        buffer.extend_from_slice(format!("{}: {}\r\n", key, value).as_bytes());
    }

    buffer.extend_from_slice(b"\r\n");
    buffer.extend_from_slice(&outbound.body);

    buffer
}

async fn read_http_response<S>(stream: &mut S) -> Result<Response>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        let n = stream.read_buf(&mut buffer).await?;

        if let Some(headers_end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            let header_bytes = buffer.split_to(headers_end + 4);
            let (status, headers) = parse_response_headers(&header_bytes)?;
            let body = read_response_body(stream, &mut buffer, &headers).await?;

            return Ok(Response::builder(status)
                .headers(headers)
                .body(body)
                .build());
        }

        if n == 0 {
            anyhow::bail!("connection closed before complete response received");
        }

        if buffer.len() > MAX_HEADER_BYTES {
            anyhow::bail!("response headers too large");
        }
    }
}

/// Parses the status line and headers of a response head.
pub fn parse_response_headers(header_bytes: &[u8]) -> Result<(StatusCode, HashMap<String, String>)> {
    let head = std::str::from_utf8(header_bytes).context("invalid UTF-8 in response headers")?;

    let mut lines = head.lines();

    let status_line = lines.next().context("empty response")?;
    let parts: Vec<&str> = status_line.splitn(3, ' ').collect();

    if parts.len() < 2 || !parts[0].starts_with("HTTP/") {
        anyhow::bail!("invalid status line: {}", status_line);
    }

    let code: u16 = parts[1].parse().context("invalid status code")?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }

        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok((StatusCode::from_u16(code), headers))
}

async fn read_response_body<S>(
    stream: &mut S,
    buffer: &mut BytesMut,
    headers: &HashMap<String, String>,
) -> Result<Bytes>
where
    S: AsyncRead + Unpin,
{
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, v)| v.parse::<usize>())
        .transpose()
        .context("invalid Content-Length")?;

    let Some(content_length) = content_length else {
        // No length: the peer closes when done.
        loop {
            let n = stream.read_buf(buffer).await?;
            if n == 0 {
                break;
            }
        }
        return Ok(buffer.split().freeze());
    };

    while buffer.len() < content_length {
        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            anyhow::bail!("connection closed before complete body received");
        }
    }

    let body = buffer.split_to(content_length).freeze();
    buffer.advance(buffer.len());
    Ok(body)
}

/// Maps a failed exchange to a non-ok response.
pub fn error_response(error: &anyhow::Error) -> Response {
    let timed_out = error.chain().any(|cause| cause.is::<Elapsed>());

    let (status, body): (StatusCode, &'static [u8]) = if timed_out {
        (
            StatusCode::GatewayTimeout,
            b"504 Gateway Timeout\r\n\r\nThe upstream server did not respond in time.",
        )
    } else {
        (
            StatusCode::BadGateway,
            b"502 Bad Gateway\r\n\r\nFailed to reach the upstream server.",
        )
    };

    Response::builder(status)
        .header("Content-Type", "text/plain")
        .body(body)
        .build()
}
