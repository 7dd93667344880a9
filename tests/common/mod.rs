//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    routing::put,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use service_mesh::config::{GatewayConfig, RouteConfig};
use service_mesh::{Gateway, Shutdown};

/// A request as observed by a mock backend.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Handle on a running recording backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    pub calls: Arc<AtomicU32>,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Seen {
        self.seen.lock().unwrap().last().cloned().expect("backend saw no request")
    }
}

/// Start a backend that records every request and answers
/// `{"backend": <name>, "uri": <path and query>}`.
pub async fn start_recording_backend(name: &'static str) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        calls: Arc::new(AtomicU32::new(0)),
        seen: Arc::new(Mutex::new(Vec::new())),
    };

    let state = backend.clone();
    let app = Router::new().fallback(move |request: Request| {
        let state = state.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
            let uri = parts.uri.to_string();

            state.calls.fetch_add(1, Ordering::SeqCst);
            state.seen.lock().unwrap().push(Seen {
                method: parts.method.to_string(),
                uri: uri.clone(),
                headers: parts.headers,
                body,
            });

            (
                [("x-backend", name)],
                Json(json!({ "backend": name, "uri": uri })),
            )
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    backend
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, Body)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        calls: Arc::new(AtomicU32::new(0)),
        seen: Arc::new(Mutex::new(Vec::new())),
    };

    let calls = backend.calls.clone();
    let f = Arc::new(f);
    let app = Router::new().fallback(move || {
        let calls = calls.clone();
        let f = f.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let (status, body) = f().await;
            (StatusCode::from_u16(status).unwrap(), body)
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    backend
}

/// An address nothing listens on.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Start a gateway over `routes` on an ephemeral port.
pub async fn start_gateway(routes: Vec<RouteConfig>, upstream_secs: u64) -> (SocketAddr, Shutdown) {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.routes = routes;
    config.timeouts.upstream_secs = upstream_secs;

    let gateway = Gateway::initialize(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = gateway.serve(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Minimal Consul agent: keeps registrations keyed by ID.
#[derive(Clone)]
pub struct MockAgent {
    pub addr: SocketAddr,
    pub services: Arc<Mutex<HashMap<String, Value>>>,
}

impl MockAgent {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.services.lock().unwrap().get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.services.lock().unwrap().len()
    }
}

/// Start a mock agent. With `reject_status` set, every registration is
/// refused with that status.
pub async fn start_mock_agent(reject_status: Option<u16>) -> MockAgent {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let agent = MockAgent {
        addr: listener.local_addr().unwrap(),
        services: Arc::new(Mutex::new(HashMap::new())),
    };

    async fn register(
        State((agent, reject)): State<(MockAgent, Option<u16>)>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        if let Some(status) = reject {
            return StatusCode::from_u16(status).unwrap();
        }
        let Some(id) = body["ID"].as_str().map(str::to_string) else {
            return StatusCode::BAD_REQUEST;
        };
        agent.services.lock().unwrap().insert(id, body);
        StatusCode::OK
    }

    async fn deregister(
        State((agent, _)): State<(MockAgent, Option<u16>)>,
        Path(id): Path<String>,
    ) -> StatusCode {
        match agent.services.lock().unwrap().remove(&id) {
            Some(_) => StatusCode::OK,
            None => StatusCode::NOT_FOUND,
        }
    }

    let app = Router::new()
        .route("/v1/agent/service/register", put(register))
        .route("/v1/agent/service/deregister/{id}", put(deregister))
        .with_state((agent.clone(), reject_status));

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    agent
}
