//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) and propagate it
//! - Prepare request for forwarding to backend
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Only the target authority and `Host` change; path, query and body are
//!   forwarded as received

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, HeaderValue, Request, Uri, Version};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::response::{strip_hop_by_hop, ProxyError};
use crate::routing::Upstream;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Layer that assigns an `x-request-id` to requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that echoes the request's `x-request-id` on the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Read the correlation ID of a request.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Rewrite an inbound request into the request sent to `upstream`.
///
/// The URI gains the upstream scheme and authority, `Host` is set to the
/// authority, hop-by-hop headers are dropped and the client address is
/// appended to `X-Forwarded-For`. Path, query and body are untouched.
pub fn prepare_upstream_request(
    request: Request<Body>,
    upstream: &Upstream,
) -> Result<Request<Body>, ProxyError> {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (mut parts, body) = request.into_parts();

    parts.uri = upstream_uri(&parts, upstream)?;
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);

    let host = HeaderValue::from_str(upstream.authority().as_str())
        .map_err(|_| ProxyError::BadRequest)?;
    parts.headers.insert(header::HOST, host);

    if let Some(addr) = client_addr {
        let ip = addr.ip().to_string();
        let forwarded = match parts.headers.get(X_FORWARDED_FOR) {
            Some(prior) => [prior.as_bytes(), &b", "[..], ip.as_bytes()].concat(),
            None => ip.into_bytes(),
        };
        if let Ok(value) = HeaderValue::from_bytes(&forwarded) {
            parts.headers.insert(X_FORWARDED_FOR, value);
        }
    }

    Ok(Request::from_parts(parts, body))
}

fn upstream_uri(parts: &Parts, upstream: &Upstream) -> Result<Uri, ProxyError> {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Uri::builder()
        .scheme(upstream.scheme().clone())
        .authority(upstream.authority().clone())
        .path_and_query(path_and_query)
        .build()
        .map_err(|_| ProxyError::BadRequest)
}
