//! Per-connection state machine: parse one request, run the cache pipeline
//! or forward plainly, write one response, close.
//!
//! One `tokio::task` per accepted connection, no pipelining, no
//! client-facing keep-alive — translating the original's one-thread-per-
//! client model (`Proxy::client_thread`/`handle_client`) onto async tasks
//! instead of OS threads.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use cache_core::{decide, CacheControl, EntryTiming};

use crate::connect::handle_connect;
use crate::dispatcher::{fetch_direct, fetch_revalidate, forward_uncached};
use crate::environment::Environment;
use crate::error::ProxyError;
use crate::wire::read_request;

/// Drives one accepted connection to completion.
pub async fn handle_connection(env: Environment, mut stream: TcpStream) {
    let request = match read_request(&mut stream).await {
        Ok(request) => request,
        Err(_) => {
            let _ = write_status_only(&mut stream, "HTTP/1.1 400 Bad Request").await;
            return;
        }
    };

    tracing::info!(method = %request.method, target = %request.target, "handling request");

    let result = match request.method.as_str() {
        "GET" => handle_get(&env, &request).await,
        "POST" => forward_uncached(&env, &request).await,
        "CONNECT" => {
            handle_connect(&env, &mut stream, &request.target).await;
            return;
        }
        other => Err(ProxyError::UnsupportedMethod(other.to_string())),
    };

    match result {
        Ok(bytes) => {
            let _ = stream.write_all(&bytes).await;
        }
        Err(ProxyError::UnsupportedMethod(_)) => {
            let _ = write_status_with_allow(&mut stream).await;
        }
        Err(err) => {
            if let Some(line) = err.status_line() {
                let _ = write_status_only(&mut stream, line).await;
            }
            tracing::warn!(error = %err, "request failed");
        }
    }
}

async fn handle_get(env: &Environment, request: &crate::wire::ParsedRequest) -> Result<Vec<u8>, ProxyError> {
    let cc = CacheControl::from_headers(&request.headers);
    let now = env.clock.now();
    let (status, entry) = env.cache.lookup(&request.target, now);

    let timing = entry.as_ref().map(|e| EntryTiming {
        age: e.age(now),
        time_to_expiry: e.time_to_expiry(now),
        stale_time: e.stale_time(now),
    });

    let decision = decide(&cc, status, timing);

    use cache_core::Decision::*;
    match decision {
        ReturnCache => match entry {
            Some(entry) => Ok(entry.to_wire_bytes()),
            None => fetch_direct(env, request).await,
        },
        Return504 => Err(ProxyError::OnlyIfCachedMiss),
        Return304 => Ok(b"HTTP/1.1 304 Not Modified\r\n\r\n".to_vec()),
        Direct | NoTransform => fetch_direct(env, request).await,
        Revalidate => match entry {
            Some(entry) => fetch_revalidate(env, request, &entry).await,
            None => fetch_direct(env, request).await,
        },
    }
}

async fn write_status_only(stream: &mut TcpStream, status_line: &str) -> std::io::Result<()> {
    let out = format!("{status_line}\r\n\r\n");
    stream.write_all(out.as_bytes()).await
}

async fn write_status_with_allow(stream: &mut TcpStream) -> std::io::Result<()> {
    let out = "HTTP/1.1 405 Method Not Allowed\r\nAllow: GET, POST, CONNECT\r\n\r\n";
    stream.write_all(out.as_bytes()).await
}
