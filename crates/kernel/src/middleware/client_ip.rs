//! Client address resolution.
//!
//! Resolves the caller's IP once per request and stores it as a
//! [`ClientIp`] extension for the audit trail.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

/// IP address of the caller, as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

/// Determine the client address.
///
/// Proxy headers win over the socket address; `"unknown"` when neither is
/// available.
pub fn client_address(addr: Option<SocketAddr>, headers: &HeaderMap) -> String {
    // Check X-Forwarded-For header first (for proxied requests)
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.split(',').next()
    {
        // Take the first IP in the chain
        return ip.trim().to_string();
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        return value.trim().to_string();
    }

    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware attaching [`ClientIp`] to every request.
pub async fn resolve_client_ip(mut request: Request<Body>, next: Next) -> Response {
    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = client_address(addr, request.headers());
    request.extensions_mut().insert(ClientIp(ip));
    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn forwarded_header_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_address(None, &headers), "203.0.113.9");
    }

    #[test]
    fn real_ip_header_is_second_choice() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_address(None, &headers), "10.0.0.2");
    }

    #[test]
    fn socket_address_is_the_fallback() {
        let addr: SocketAddr = "192.0.2.4:5123".parse().unwrap();
        assert_eq!(client_address(Some(addr), &HeaderMap::new()), "192.0.2.4");
        assert_eq!(client_address(None, &HeaderMap::new()), "unknown");
    }
}
