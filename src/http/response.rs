//! Response handling and transformation.
//!
//! # Responsibilities
//! - Strip connection-scoped headers from relayed messages
//! - Map proxy failures to status codes with a generic JSON body
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Backend timeouts result in 504 Gateway Timeout, connect failures in 502
//! - Error bodies never carry upstream error detail

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Headers that only describe a single hop and are never relayed.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Failures the gateway reports to its caller.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no route matched")]
    NoRoute,

    #[error("malformed request target")]
    BadRequest,

    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    #[error("upstream timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoRoute => StatusCode::NOT_FOUND,
            ProxyError::BadRequest => StatusCode::BAD_REQUEST,
            ProxyError::Unreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ProxyError::NoRoute => "no matching route",
            ProxyError::BadRequest => "bad request",
            ProxyError::Unreachable(_) => "upstream unavailable",
            ProxyError::Timeout(_) => "upstream timed out",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}
