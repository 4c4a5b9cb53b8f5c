//! A minimal HTTP/1.1 request/response reader: head parsing via `httparse`
//! plus a `Content-Length`-driven body read.
//!
//! This plays the role the core cache spec assumes away as "a correct
//! streaming parser that yields `{method, target, version, headers, body}`".
//! No chunked transfer-encoding, no trailers, no pipelining — exactly what a
//! proxy whose origins are test fixtures and simple HTTP servers needs.

use tokio::io::{AsyncRead, AsyncReadExt};

use cache_core::RawHeaders;

use crate::error::ProxyError;

/// Header sections larger than this are rejected rather than grown without
/// bound.
const MAX_HEAD_BYTES: usize = 64 * 1024;
const MAX_HEADER_COUNT: usize = 64;

/// A parsed client request.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// Request target exactly as received (absolute-URI for a forward proxy).
    pub target: String,
    /// Request headers, in wire order.
    pub headers: RawHeaders,
    /// Request body, if any (read according to `Content-Length`).
    pub body: Vec<u8>,
}

/// A parsed origin response.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    /// Status code, e.g. `200`.
    pub status: u16,
    /// Reason phrase, e.g. `OK`.
    pub reason: String,
    /// Response headers, in wire order.
    pub headers: RawHeaders,
    /// Response body, read according to `Content-Length` (absent ⇒ empty).
    pub body: Vec<u8>,
}

impl ParsedResponse {
    /// Reconstructs the status line, e.g. `HTTP/1.1 200 OK`.
    pub fn status_line(&self) -> String {
        format!("HTTP/1.1 {} {}", self.status, self.reason)
    }
}

async fn fill_until<R: AsyncRead + Unpin>(
    stream: &mut R,
    buf: &mut Vec<u8>,
    is_complete: impl Fn(&[u8]) -> bool,
) -> Result<(), std::io::Error> {
    let mut chunk = [0u8; 8192];
    while !is_complete(buf) {
        if buf.len() >= MAX_HEAD_BYTES {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "head too large"));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(())
}

fn has_head_terminator(buf: &[u8]) -> bool {
    buf.windows(4).any(|w| w == b"\r\n\r\n")
}

fn content_length(headers: &RawHeaders) -> usize {
    headers.get("Content-Length").and_then(|v| v.trim().parse::<usize>().ok()).unwrap_or(0)
}

/// Reads and parses one HTTP/1.1 request from `stream`.
pub async fn read_request<R: AsyncRead + Unpin>(
    stream: &mut R,
) -> Result<ParsedRequest, ProxyError> {
    let mut buf = Vec::with_capacity(8192);
    fill_until(stream, &mut buf, has_head_terminator).await.map_err(|_| ProxyError::ClientProtocol)?;
    if !has_head_terminator(&buf) {
        return Err(ProxyError::ClientProtocol);
    }

    let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADER_COUNT];
    let mut req = httparse::Request::new(&mut raw_headers);
    let head_len = match req.parse(&buf).map_err(|_| ProxyError::ClientProtocol)? {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => return Err(ProxyError::ClientProtocol),
    };

    let method = req.method.ok_or(ProxyError::ClientProtocol)?.to_string();
    let target = req.path.ok_or(ProxyError::ClientProtocol)?.to_string();
    let headers: RawHeaders = req
        .headers
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
        .collect();

    let declared_len = content_length(&headers);
    let mut body = buf[head_len..].to_vec();
    while body.len() < declared_len {
        let mut chunk = [0u8; 8192];
        let n = stream.read(&mut chunk).await.map_err(|_| ProxyError::ClientProtocol)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(declared_len.min(body.len()));

    Ok(ParsedRequest { method, target, headers, body })
}

/// Reads and parses one HTTP/1.1 response from `stream`.
pub async fn read_response<R: AsyncRead + Unpin>(
    stream: &mut R,
) -> Result<ParsedResponse, ProxyError> {
    let mut buf = Vec::with_capacity(8192);
    fill_until(stream, &mut buf, has_head_terminator).await.map_err(|_| ProxyError::OriginProtocol)?;
    if !has_head_terminator(&buf) {
        return Err(ProxyError::OriginProtocol);
    }

    let mut raw_headers = [httparse::EMPTY_HEADER; MAX_HEADER_COUNT];
    let mut resp = httparse::Response::new(&mut raw_headers);
    let head_len = match resp.parse(&buf).map_err(|_| ProxyError::OriginProtocol)? {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => return Err(ProxyError::OriginProtocol),
    };

    let status = resp.code.ok_or(ProxyError::OriginProtocol)?;
    let reason = resp.reason.unwrap_or("").to_string();
    let headers: RawHeaders = resp
        .headers
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
        .collect();

    let declared_len = content_length(&headers);
    let mut body = buf[head_len..].to_vec();
    while body.len() < declared_len {
        let mut chunk = [0u8; 8192];
        let n = stream.read(&mut chunk).await.map_err(ProxyError::OriginTransport)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(declared_len.min(body.len()));

    Ok(ParsedResponse { status, reason, headers, body })
}
