//! Record storage capability.
//!
//! Handlers reach persistence only through `RecordStore`, injected via
//! router state. `InMemoryRecordStore` backs local runs and tests; a real
//! document or relational store plugs in behind the same trait.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A stored JSON document with a generated ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        match self {
            StoreError::NotFound(_) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "record not found" }))).into_response()
            }
            StoreError::Backend(e) => {
                tracing::error!(error = %e, "Storage backend error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, fields: Map<String, Value>) -> Result<Record, StoreError>;

    async fn list(&self) -> Result<Vec<Record>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Record, StoreError>;

    /// Merge `fields` into the record; keys not present are left alone.
    async fn update(&self, id: Uuid, fields: Map<String, Value>) -> Result<Record, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Insertion-ordered in-memory store.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<Record>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, mut fields: Map<String, Value>) -> Result<Record, StoreError> {
        fields.remove("id");
        let record = Record {
            id: Uuid::new_v4(),
            fields,
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Record, StoreError> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: Uuid, mut fields: Map<String, Value>) -> Result<Record, StoreError> {
        fields.remove("id");
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.fields.extend(fields);
        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
