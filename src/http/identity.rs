//! Caller identification for counter keys.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Identity used when the host did not attach connection info.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Derives the per-caller part of a counter key from a request.
///
/// The returned string is used verbatim; the extractor is trusted to return
/// something stable and hard to spoof for its deployment.
pub trait IdentityExtractor: Send + Sync {
    fn identify(&self, req: &Request) -> String;
}

impl<F> IdentityExtractor for F
where
    F: Fn(&Request) -> String + Send + Sync,
{
    fn identify(&self, req: &Request) -> String {
        self(req)
    }
}

/// Identifies callers by the IP of the connected peer.
///
/// Requires the server to be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerAddr;

impl IdentityExtractor for PeerAddr {
    fn identify(&self, req: &Request) -> String {
        peer_ip(req).unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
    }
}

/// Identifies callers by proxy headers, falling back to the peer address.
///
/// Only use this behind a reverse proxy that overwrites `X-Forwarded-For`
/// and `X-Real-IP`; otherwise clients can pick their own identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardedFor;

impl IdentityExtractor for ForwardedFor {
    fn identify(&self, req: &Request) -> String {
        let headers = req.headers();
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            // Leftmost entry is the original client
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
            .or_else(|| peer_ip(req))
            .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
    }
}

fn peer_ip(req: &Request) -> Option<String> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
