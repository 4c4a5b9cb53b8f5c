//! `CONNECT` tunnel: establish a TCP connection to the target, answer `200
//! Connection established`, then relay bytes bidirectionally until either
//! side closes or the tunnel sits idle past the configured timeout.
//!
//! Translates the original `Proxy::handle_connect`'s `select()`-based relay
//! loop into two concurrent async read/write loops, each independently
//! timing out on idle — the cache plays no part here; `CONNECT` bypasses it
//! entirely.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

use crate::environment::Environment;

fn parse_authority(authority: &str) -> Option<(String, u16)> {
    match authority.rsplit_once(':') {
        Some((host, port)) => port.parse::<u16>().ok().map(|p| (host.to_string(), p)),
        None => Some((authority.to_string(), 80)),
    }
}

/// Handles one `CONNECT host:port` request on `client`.
pub async fn handle_connect(env: &Environment, client: &mut TcpStream, target: &str) {
    let Some((host, port)) = parse_authority(target) else {
        let _ = client.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
        return;
    };

    tracing::info!(host = %host, port, "CONNECT requested");

    let addr = format!("{host}:{port}");
    let mut server = match timeout(env.config.origin_connect_timeout(), TcpStream::connect(&addr)).await
    {
        Ok(Ok(server)) => server,
        _ => {
            let _ = client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
            return;
        }
    };

    if client.write_all(b"HTTP/1.1 200 Connection established\r\n\r\n").await.is_err() {
        return;
    }

    relay(client, &mut server, env.config.connect_idle_timeout()).await;
}

async fn relay(client: &mut TcpStream, server: &mut TcpStream, idle_timeout: Duration) {
    let (mut client_r, mut client_w) = client.split();
    let (mut server_r, mut server_w) = server.split();

    let client_to_server = async {
        let mut buf = [0u8; 8192];
        loop {
            let n = match timeout(idle_timeout, client_r.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
                Ok(Ok(n)) => n,
            };
            if server_w.write_all(&buf[..n]).await.is_err() {
                break;
            }
        }
    };

    let server_to_client = async {
        let mut buf = [0u8; 8192];
        loop {
            let n = match timeout(idle_timeout, server_r.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
                Ok(Ok(n)) => n,
            };
            if client_w.write_all(&buf[..n]).await.is_err() {
                break;
            }
        }
    };

    tokio::join!(client_to_server, server_to_client);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_with_explicit_port() {
        assert_eq!(parse_authority("example.com:443"), Some(("example.com".to_string(), 443)));
    }

    #[test]
    fn authority_without_port_defaults_to_80() {
        assert_eq!(parse_authority("example.com"), Some(("example.com".to_string(), 80)));
    }

    #[test]
    fn authority_with_garbage_port_is_rejected() {
        assert_eq!(parse_authority("example.com:notaport"), None);
    }
}
