//! Upstream forwarding.
//!
//! One `Forwarder` is built at startup and shared by every request. It owns
//! the pooled HTTP client and the single per-call timeout, so no call site
//! constructs its own deadline.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::http::request::{prepare_upstream_request, RequestIdExt};
use crate::http::response::{strip_hop_by_hop, ProxyError};
use crate::routing::Route;

/// Forwards requests to a route's upstream and relays the streamed response.
///
/// Only the wait for response headers is bounded. Once headers arrive the
/// body is relayed as the backend produces it with no idle deadline, so a
/// backend that stalls mid-body holds the client connection until it
/// finishes or either side disconnects.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }

    /// The deadline applied to every forwarded call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request` to the route's upstream.
    ///
    /// The timeout bounds the wait for response headers; the body is then
    /// streamed through as the backend produces it. Dropping the returned
    /// future (client went away) cancels the upstream call.
    pub async fn forward(
        &self,
        route: &Route,
        request: Request<Body>,
    ) -> Result<Response<Body>, ProxyError> {
        let request_id = request.request_id().to_string();
        let outbound = prepare_upstream_request(request, &route.upstream)?;

        tracing::debug!(
            request_id = %request_id,
            route = %route.name,
            uri = %outbound.uri(),
            "Forwarding request"
        );

        let response = match tokio::time::timeout(self.timeout, self.client.request(outbound)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(
                    request_id = %request_id,
                    upstream = %route.upstream,
                    error = %e,
                    "Upstream error"
                );
                return Err(ProxyError::Unreachable(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(
                    request_id = %request_id,
                    upstream = %route.upstream,
                    timeout = ?self.timeout,
                    "Upstream timed out"
                );
                return Err(ProxyError::Timeout(self.timeout));
            }
        };

        Ok(relay(response))
    }
}

/// Convert an upstream response into one the gateway can return.
fn relay(response: Response<Incoming>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
