//! Gateway routing and failure handling against live mock backends.

use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use futures_util::stream;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use service_mesh::config::RouteConfig;

mod common;

#[tokio::test]
async fn test_prefix_routing_preserves_path() {
    let users = common::start_recording_backend("users").await;
    let products = common::start_recording_backend("products").await;
    let (gateway, shutdown) = common::start_gateway(
        vec![
            RouteConfig::new("users", "/users/*", users.url()),
            RouteConfig::new("products", "/products/*", products.url()),
        ],
        5,
    )
    .await;

    let res = common::client()
        .get(format!("http://{}/users/42", gateway))
        .send()
        .await
        .expect("Gateway unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-backend"], "users");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "backend": "users", "uri": "/users/42" }));

    assert_eq!(users.call_count(), 1);
    assert_eq!(products.call_count(), 0);

    let seen = users.last();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.uri, "/users/42");
    assert_eq!(seen.headers["host"], users.addr.to_string().as_str());

    let res = common::client()
        .get(format!("http://{}/products/7", gateway))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["backend"], "products");
    assert_eq!(body["uri"], "/products/7");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_path_never_reaches_a_backend() {
    let users = common::start_recording_backend("users").await;
    let products = common::start_recording_backend("products").await;
    let (gateway, shutdown) = common::start_gateway(
        vec![
            RouteConfig::new("users", "/users/*", users.url()),
            RouteConfig::new("products", "/products/*", products.url()),
        ],
        5,
    )
    .await;

    let client = common::client();
    for path in ["/orders/1", "/", "/usersx/1"] {
        let res = client
            .get(format!("http://{}{}", gateway, path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "path {}", path);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "error": "no matching route" }));
    }

    assert_eq!(users.call_count(), 0);
    assert_eq!(products.call_count(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_method_query_and_body_pass_through() {
    let products = common::start_recording_backend("products").await;
    let (gateway, shutdown) = common::start_gateway(
        vec![RouteConfig::new("products", "/products/*", products.url())],
        5,
    )
    .await;

    let res = common::client()
        .put(format!("http://{}/products/9?fields=name&dry_run=1", gateway))
        .header("content-type", "application/json")
        .header("x-custom", "kept")
        .body(r#"{"name":"lamp","price":12.5}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let seen = products.last();
    assert_eq!(seen.method, "PUT");
    assert_eq!(seen.uri, "/products/9?fields=name&dry_run=1");
    assert_eq!(seen.body, Bytes::from_static(br#"{"name":"lamp","price":12.5}"#));
    assert_eq!(seen.headers["x-custom"], "kept");
    assert_eq!(seen.headers["content-type"], "application/json");
    assert!(seen.headers.contains_key("x-forwarded-for"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_backend_errors_relayed_without_retry() {
    let backend = common::start_programmable_backend(|| async {
        (503, Body::from("busy"))
    })
    .await;
    let (gateway, shutdown) = common::start_gateway(
        vec![RouteConfig::new("users", "/users/*", backend.url())],
        5,
    )
    .await;

    let res = common::client()
        .get(format!("http://{}/users/1", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "busy");
    assert_eq!(backend.call_count(), 1, "Gateway must not retry");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let dead = common::closed_addr();
    let (gateway, shutdown) = common::start_gateway(
        vec![RouteConfig::new("users", "/users/*", format!("http://{}", dead))],
        5,
    )
    .await;

    let res = common::client()
        .get(format!("http://{}/users/1", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "upstream unavailable" }));

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let backend = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        (200, Body::from("too late"))
    })
    .await;
    let (gateway, shutdown) = common::start_gateway(
        vec![RouteConfig::new("users", "/users/*", backend.url())],
        1,
    )
    .await;

    let start = Instant::now();
    let res = common::client()
        .get(format!("http://{}/users/slow", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());

    shutdown.trigger();
}

#[tokio::test]
async fn test_timeout_bounds_headers_not_body() {
    let backend = common::start_programmable_backend(|| async {
        let late = stream::once(async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok::<_, std::io::Error>(Bytes::from_static(b"slow body"))
        });
        (200, Body::from_stream(late))
    })
    .await;
    let (gateway, shutdown) = common::start_gateway(
        vec![RouteConfig::new("files", "/files/*", backend.url())],
        1,
    )
    .await;

    let res = common::client()
        .get(format!("http://{}/files/slow", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "slow body");

    shutdown.trigger();
}

#[tokio::test]
async fn test_large_response_streamed_intact() {
    const CHUNK: usize = 64 * 1024;
    const CHUNKS: usize = 32;

    let backend = common::start_programmable_backend(|| async {
        let chunks = (0..CHUNKS).map(|i| {
            Ok::<_, std::io::Error>(Bytes::from(vec![b'a' + (i % 26) as u8; CHUNK]))
        });
        (200, Body::from_stream(stream::iter(chunks)))
    })
    .await;
    let (gateway, shutdown) = common::start_gateway(
        vec![RouteConfig::new("files", "/files/*", backend.url())],
        5,
    )
    .await;

    let res = common::client()
        .get(format!("http://{}/files/big", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.bytes().await.unwrap();
    assert_eq!(body.len(), CHUNK * CHUNKS);
    assert_eq!(body[0], b'a');
    assert_eq!(body[CHUNK * CHUNKS - 1], b'a' + ((CHUNKS - 1) % 26) as u8);

    shutdown.trigger();
}

#[tokio::test]
async fn test_health_and_request_id() {
    let users = common::start_recording_backend("users").await;
    let (gateway, shutdown) = common::start_gateway(
        vec![RouteConfig::new("users", "/users/*", users.url())],
        5,
    )
    .await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/health", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "status": "gateway up" }));
    assert_eq!(users.call_count(), 0);

    let res = client
        .get(format!("http://{}/users/1", gateway))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-123");
    assert_eq!(users.last().headers["x-request-id"], "req-123");

    let res = client
        .get(format!("http://{}/users/2", gateway))
        .send()
        .await
        .unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(!generated.is_empty());
    assert_eq!(users.last().headers["x-request-id"], generated.as_str());

    shutdown.trigger();
}

#[tokio::test]
async fn test_client_disconnect_cancels_upstream_call() {
    // Backend that reads the request, never answers, and reports when the
    // gateway closes its side of the connection.
    let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend_addr = backend.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel::<Instant>();
    tokio::spawn(async move {
        let (mut conn, _) = backend.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        loop {
            match conn.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = closed_tx.send(Instant::now());
    });

    let (gateway, shutdown) = common::start_gateway(
        vec![RouteConfig::new("users", "/users/*", format!("http://{}", backend_addr))],
        30,
    )
    .await;

    let mut client = TcpStream::connect(gateway).await.unwrap();
    client
        .write_all(b"GET /users/1 HTTP/1.1\r\nHost: gateway\r\n\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let dropped_at = Instant::now();
    drop(client);

    let closed_at = tokio::time::timeout(Duration::from_secs(5), closed_rx)
        .await
        .expect("upstream call outlived the client")
        .unwrap();
    assert!(closed_at.duration_since(dropped_at) < Duration::from_secs(5));

    shutdown.trigger();
}
