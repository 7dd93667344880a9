//! Backend service HTTP surface.
//!
//! - `GET <health path>` → `{"status": "<name> up"}` (probed by the registry,
//!   `/health` by default)
//! - `POST|GET /<collection>/`
//! - `GET|PUT|DELETE /<collection>/{id}`

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::service::store::{RecordStore, StoreError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct ServiceState {
    pub name: Arc<str>,
    pub store: Arc<dyn RecordStore>,
}

/// Build the service router for `collection`, backed by `store`.
///
/// The health handler is mounted at `health_path`, the same path the
/// registry check declares.
pub fn service_router(
    name: &str,
    collection: &str,
    health_path: &str,
    store: Arc<dyn RecordStore>,
) -> Router {
    let state = ServiceState {
        name: Arc::from(name),
        store,
    };

    let list_path = format!("/{}/", collection);
    let item_path = format!("/{}/{{id}}", collection);

    Router::new()
        .route(health_path, get(health_handler))
        .route(&list_path, get(list_records).post(create_record))
        .route(&item_path, get(get_record).put(update_record).delete(delete_record))
        .with_state(state)
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}

async fn health_handler(State(state): State<ServiceState>) -> Json<Value> {
    Json(json!({ "status": format!("{} up", state.name) }))
}

fn bad_request(message: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn parse_id(id: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(id).map_err(|_| bad_request("invalid id"))
}

fn object_body(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, Response> {
    match body {
        Ok(Json(Value::Object(fields))) => Ok(fields),
        Ok(_) => Err(bad_request("body must be a JSON object")),
        Err(_) => Err(bad_request("invalid JSON body")),
    }
}

async fn create_record(
    State(state): State<ServiceState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let fields = match object_body(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    match state.store.create(fields).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn list_records(State(state): State<ServiceState>) -> Result<Response, StoreError> {
    let records = state.store.list().await?;
    Ok(Json(records).into_response())
}

async fn get_record(State(state): State<ServiceState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.store.get(id).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn update_record(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let (id, fields) = match parse_id(&id).and_then(|id| Ok((id, object_body(body)?))) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    match state.store.update(id, fields).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_record(State(state): State<ServiceState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.store.delete(id).await {
        Ok(()) => Json(json!({ "message": "record deleted" })).into_response(),
        Err(e) => e.into_response(),
    }
}
