//! Service registry client.
//!
//! # Lifecycle
//! ```text
//! startup:   ServiceRegistration → register() → RegistryHandle   (fatal on error)
//! shutdown:  RegistryHandle → deregister()                       (best effort)
//! ```
//!
//! # Design Decisions
//! - Registering an ID that is already present replaces the record (upsert)
//! - Health probing is done by the registry itself, never by this client
//! - Backends depend on the `ServiceRegistry` trait so tests can swap in
//!   `InMemoryRegistry`

pub mod consul;
pub mod memory;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use consul::ConsulRegistry;
pub use memory::InMemoryRegistry;
pub use types::{HealthCheck, RegistryHandle, ServiceRegistration};

/// Errors talking to the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid registry address '{0}'")]
    InvalidAddress(String),

    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry rejected {operation} with status {status}: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("service '{0}' is not registered")]
    NotRegistered(String),
}

/// Registry capability used by backend services.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Register (or replace) the instance record.
    async fn register(
        &self,
        registration: &ServiceRegistration,
    ) -> Result<RegistryHandle, RegistryError>;

    /// Remove the instance record.
    async fn deregister(&self, handle: RegistryHandle) -> Result<(), RegistryError>;
}
