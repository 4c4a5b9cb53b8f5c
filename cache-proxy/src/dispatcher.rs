//! Revalidation / origin dispatcher: turns a `Decision` into the bytes sent
//! back to the client, talking to the origin and updating the cache as it
//! goes.
//!
//! Mirrors the original `Proxy::handle_get`/`revalid`/`handle_revalid`/
//! `returnCache` control flow, generalized onto the five-way `Decision`
//! enum instead of an ad hoc `if` chain: fall through to a direct fetch when
//! an entry carries no validator, serve the *cached* bytes (not a bare 304)
//! on a successful revalidation, and replace the stored entry on 200.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;

use cache_core::CacheEntry;

use crate::environment::Environment;
use crate::error::ProxyError;
use crate::wire::{read_response, ParsedRequest, ParsedResponse};

/// Splits an absolute-URI request target into `(host, port, path)`.
fn parse_target(target: &str) -> Result<(String, u16, String), ProxyError> {
    let without_scheme = target.strip_prefix("http://").unwrap_or(target);
    let (authority, path) = match without_scheme.find('/') {
        Some(pos) => (&without_scheme[..pos], &without_scheme[pos..]),
        None => (without_scheme, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => (h.to_string(), p.parse::<u16>().map_err(|_| ProxyError::ClientProtocol)?),
        None => (authority.to_string(), 80),
    };
    if host.is_empty() {
        return Err(ProxyError::ClientProtocol);
    }
    Ok((host, port, path.to_string()))
}

/// Resolves `host:port`, then connects to the first address it yields.
/// Resolution and connection are distinguished so a DNS failure maps to
/// `OriginResolution` rather than being folded into `OriginConnect`.
async fn connect_to_origin(
    env: &Environment,
    host: &str,
    port: u16,
) -> Result<TcpStream, ProxyError> {
    let addr = format!("{host}:{port}");

    let resolve = timeout(env.config.origin_connect_timeout(), lookup_host(&addr));
    let mut addrs = match resolve.await {
        Err(_) => return Err(ProxyError::OriginConnectTimeout),
        Ok(Err(e)) => return Err(ProxyError::OriginResolution(e)),
        Ok(Ok(addrs)) => addrs,
    };
    let socket_addr = addrs.next().ok_or_else(|| {
        ProxyError::OriginResolution(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no addresses found for {addr}"),
        ))
    })?;

    let connect = timeout(env.config.origin_connect_timeout(), TcpStream::connect(socket_addr));
    match connect.await {
        Err(_) => Err(ProxyError::OriginConnectTimeout),
        Ok(Err(e)) => Err(ProxyError::OriginConnect(e)),
        Ok(Ok(stream)) => Ok(stream),
    }
}

fn build_get_request(host: &str, path: &str, if_none_match: Option<&str>) -> String {
    let mut req = format!("GET {path} HTTP/1.1\r\n");
    req.push_str(&format!("Host: {host}\r\n"));
    req.push_str("Connection: close\r\n");
    req.push_str("Accept: */*\r\n");
    req.push_str("User-Agent: cache-proxy/0.1\r\n");
    if let Some(etag) = if_none_match {
        req.push_str(&format!("If-None-Match: \"{etag}\"\r\n"));
    }
    req.push_str("\r\n");
    req
}

/// Forwards a non-cacheable request (e.g. `POST`) to the origin verbatim and
/// returns the raw response bytes to write back to the client. Never touches
/// the cache.
pub async fn forward_uncached(
    env: &Environment,
    request: &ParsedRequest,
) -> Result<Vec<u8>, ProxyError> {
    let (host, port, path) = parse_target(&request.target)?;
    let mut stream = connect_to_origin(env, &host, port).await?;

    let mut head = format!("{} {} HTTP/1.1\r\n", request.method, path);
    head.push_str(&format!("Host: {host}\r\n"));
    head.push_str("Connection: close\r\n");
    let mut has_content_length = false;
    for (name, value) in request.headers.iter() {
        if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("connection") {
            continue;
        }
        if name.eq_ignore_ascii_case("content-length") {
            has_content_length = true;
        }
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    if !request.body.is_empty() && !has_content_length {
        head.push_str(&format!("Content-Length: {}\r\n", request.body.len()));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await.map_err(ProxyError::OriginTransport)?;
    if !request.body.is_empty() {
        stream.write_all(&request.body).await.map_err(ProxyError::OriginTransport)?;
    }

    let response = read_with_timeout(env, &mut stream).await?;
    Ok(response_wire_bytes(&response))
}

async fn read_with_timeout(
    env: &Environment,
    stream: &mut TcpStream,
) -> Result<ParsedResponse, ProxyError> {
    let mut reader = BufReader::new(stream);
    timeout(env.config.origin_read_timeout(), read_response(&mut reader))
        .await
        .map_err(|_| ProxyError::OriginTransport(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "origin read timed out",
        )))?
}

fn maybe_cache(env: &Environment, url: &str, response: &ParsedResponse, now: SystemTime) {
    let meta = cache_core::extract_freshness(
        response.status,
        &response.headers,
        now,
        env.config.cache_config().default_ttl,
    );
    if !meta.cacheable {
        return;
    }
    let entry = CacheEntry {
        response_line: response.status_line(),
        response_headers: response.headers.clone(),
        response_body: response.body.clone(),
        created_at: now,
        expires_at: meta.expires_at,
        etag: meta.etag,
        last_modified: meta.last_modified,
        must_revalidate: meta.must_revalidate,
    };
    if !env.cache.insert(url.to_string(), entry) {
        tracing::debug!(url, "response exceeded cache budget, forwarded but not stored");
    }
}

fn response_wire_bytes(response: &ParsedResponse) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(response.status_line().as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&response.headers.to_wire_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&response.body);
    out
}

/// `DIRECT` / `NO_TRANSFORM`: unconditional GET to the origin, forwarded
/// verbatim to the client; the response is inserted into the cache if it
/// passes the cacheability gate.
pub async fn fetch_direct(env: &Environment, request: &ParsedRequest) -> Result<Vec<u8>, ProxyError> {
    let (host, port, path) = parse_target(&request.target)?;
    let mut stream = connect_to_origin(env, &host, port).await?;
    let head = build_get_request(&host, &path, None);
    stream.write_all(head.as_bytes()).await.map_err(ProxyError::OriginTransport)?;

    let response = read_with_timeout(env, &mut stream).await?;
    maybe_cache(env, &request.target, &response, env.clock.now());
    Ok(response_wire_bytes(&response))
}

/// `REVALIDATE`: conditional GET using the stored entry's `ETag`. Falls
/// through to [`fetch_direct`] when the entry has no validator.
pub async fn fetch_revalidate(
    env: &Environment,
    request: &ParsedRequest,
    entry: &Arc<CacheEntry>,
) -> Result<Vec<u8>, ProxyError> {
    if entry.etag.is_empty() {
        return fetch_direct(env, request).await;
    }

    let (host, port, path) = parse_target(&request.target)?;
    let mut stream = connect_to_origin(env, &host, port).await?;
    let head = build_get_request(&host, &path, Some(&entry.etag));
    stream.write_all(head.as_bytes()).await.map_err(ProxyError::OriginTransport)?;

    let response = read_with_timeout(env, &mut stream).await?;
    let now = env.clock.now();

    match response.status {
        304 => {
            refresh_on_not_modified(env, &request.target, entry, &response, now);
            Ok(entry.to_wire_bytes())
        }
        200 => {
            maybe_cache(env, &request.target, &response, now);
            Ok(response_wire_bytes(&response))
        }
        _ => {
            env.cache.remove(&request.target);
            Ok(response_wire_bytes(&response))
        }
    }
}

/// Refreshing `expires_at` from a 304's own freshness headers is left
/// unspecified by RFC 7234 beyond "the cache MUST update the stored
/// response"; this proxy refreshes when the 304 carries new freshness
/// headers, and otherwise leaves the stored entry untouched — either way
/// `created_at` is never modified.
fn refresh_on_not_modified(
    env: &Environment,
    url: &str,
    entry: &Arc<CacheEntry>,
    response: &ParsedResponse,
    now: SystemTime,
) {
    if response.headers.is_empty() {
        return;
    }
    let meta = cache_core::extract_freshness(
        200,
        &response.headers,
        now,
        env.config.cache_config().default_ttl,
    );
    if !meta.cacheable {
        return;
    }
    let refreshed = CacheEntry {
        response_line: entry.response_line.clone(),
        response_headers: entry.response_headers.clone(),
        response_body: entry.response_body.clone(),
        created_at: entry.created_at,
        expires_at: meta.expires_at,
        etag: if meta.etag.is_empty() { entry.etag.clone() } else { meta.etag },
        last_modified: meta.last_modified.or(entry.last_modified),
        must_revalidate: meta.must_revalidate,
    };
    env.cache.insert(url.to_string(), refreshed);
}
