//! Gateway HTTP server.
//!
//! # Responsibilities
//! - Compile the route table (Initializing)
//! - Create the Axum router with the proxy and liveness handlers
//! - Wire up middleware (tracing, request ID)
//! - Serve until shutdown (Serving)
//!
//! A `Gateway` value only exists once every route compiled, so a partially
//! valid table is never served.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::http::forward::Forwarder;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::ProxyError;
use crate::observability::metrics;
use crate::routing::{RouteError, Router as RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
struct GatewayState {
    routes: Arc<RouteTable>,
    forwarder: Forwarder,
}

/// The edge gateway, initialized and ready to serve.
pub struct Gateway {
    router: Router,
}

impl Gateway {
    /// Compile the configured routes and build the HTTP application.
    pub fn initialize(config: GatewayConfig) -> Result<Self, RouteError> {
        let routes = Arc::new(RouteTable::from_config(&config.routes)?);
        let forwarder = Forwarder::new(&config.timeouts);

        tracing::info!(
            routes = routes.routes().len(),
            upstream_timeout = ?forwarder.timeout(),
            "Gateway initialized"
        );

        let router = Self::build_router(GatewayState { routes, forwarder });
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: GatewayState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway serving");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "gateway up" }))
}

/// Main proxy handler.
/// Looks up the route and forwards the request to its upstream.
async fn proxy_handler(State(state): State<GatewayState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request.request_id().to_string();

    let Some(route) = state.routes.match_path(&path) else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_request(&method, 404, "none", start);
        return ProxyError::NoRoute.into_response();
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route.name,
        "Proxying request"
    );

    let response = match state.forwarder.forward(route, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_request(&method, response.status().as_u16(), &route.name, start);
    response
}
