//! Backend service composition.
//!
//! A backend is its health endpoint plus a record collection, served from
//! an injected `RecordStore`. Registration is handled by
//! `lifecycle::BackendService`.

pub mod app;
pub mod store;

pub use app::{service_router, ServiceState};
pub use store::{InMemoryRecordStore, Record, RecordStore, StoreError};
