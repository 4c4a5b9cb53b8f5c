//! The single site that maps a failure inside the connection handler to the
//! status line the client actually sees.

use thiserror::Error;

/// Failure kinds the connection handler can hit, one error type per
/// handler-scoped failure mode. Every variant is recovered at the handler
/// boundary — nothing propagates past `handle_connection`.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The client's request bytes did not parse as HTTP/1.1.
    #[error("malformed client request")]
    ClientProtocol,

    /// A method other than GET, POST, or CONNECT.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// DNS resolution for the origin host failed.
    #[error("failed to resolve origin host: {0}")]
    OriginResolution(#[source] std::io::Error),

    /// TCP connect to the origin failed or timed out.
    #[error("failed to connect to origin: {0}")]
    OriginConnect(#[source] std::io::Error),

    /// Connecting to the origin took longer than the configured timeout.
    #[error("origin connect timed out")]
    OriginConnectTimeout,

    /// A read or write to the origin failed mid-exchange.
    #[error("origin transport error: {0}")]
    OriginTransport(#[source] std::io::Error),

    /// The origin's response did not parse as HTTP/1.1.
    #[error("malformed origin response")]
    OriginProtocol,

    /// The response was larger than the owning shard's byte budget; the
    /// response is still forwarded, this is not a client-visible failure.
    #[error("response too large to cache")]
    CacheOversize,

    /// `Cache-Control: only-if-cached` with no usable entry.
    #[error("only-if-cached with no cached entry")]
    OnlyIfCachedMiss,
}

impl ProxyError {
    /// The status line this error becomes when written to the client, or
    /// `None` for errors (like [`Self::CacheOversize`]) that never reach the
    /// client directly.
    pub fn status_line(&self) -> Option<&'static str> {
        match self {
            ProxyError::ClientProtocol => Some("HTTP/1.1 400 Bad Request"),
            ProxyError::UnsupportedMethod(_) => Some("HTTP/1.1 405 Method Not Allowed"),
            ProxyError::OriginResolution(_)
            | ProxyError::OriginConnect(_)
            | ProxyError::OriginTransport(_)
            | ProxyError::OriginProtocol => Some("HTTP/1.1 502 Bad Gateway"),
            ProxyError::OriginConnectTimeout => Some("HTTP/1.1 504 Gateway Timeout"),
            ProxyError::OnlyIfCachedMiss => Some("HTTP/1.1 504 Gateway Timeout"),
            ProxyError::CacheOversize => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_protocol_maps_to_400() {
        assert_eq!(
            ProxyError::ClientProtocol.status_line(),
            Some("HTTP/1.1 400 Bad Request")
        );
    }

    #[test]
    fn only_if_cached_miss_maps_to_504() {
        assert_eq!(
            ProxyError::OnlyIfCachedMiss.status_line(),
            Some("HTTP/1.1 504 Gateway Timeout")
        );
    }

    #[test]
    fn cache_oversize_never_reaches_the_client() {
        assert_eq!(ProxyError::CacheOversize.status_line(), None);
    }

    #[test]
    fn origin_resolution_maps_to_502() {
        let err = ProxyError::OriginResolution(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no addresses found for example.invalid:80",
        ));
        assert_eq!(err.status_line(), Some("HTTP/1.1 502 Bad Gateway"));
    }
}
