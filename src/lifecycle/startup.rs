//! Backend service startup and shutdown orchestration.
//!
//! # Order
//! ```text
//! start:  register with registry (fatal) → bind listener (fatal)
//! serve:  accept until the shutdown future resolves
//! stop:   deregister (bounded by grace period, once) → drain connections
//! ```
//!
//! The listener is bound only after registration succeeded, so an instance
//! the registry refused never accepts a connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::registry::{RegistryError, RegistryHandle, ServiceRegistration, ServiceRegistry};
use crate::service::{service_router, RecordStore};

/// Fatal errors while bringing a backend service up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("service registration failed: {0}")]
    Registration(#[from] RegistryError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Owns the instance's registration for the lifetime of the process.
pub struct ServiceLifecycle {
    registry: Arc<dyn ServiceRegistry>,
    service_id: String,
    handle: Mutex<Option<RegistryHandle>>,
    grace: Duration,
}

impl ServiceLifecycle {
    /// Register the instance. Any failure is returned to the caller, which
    /// must not start serving.
    pub async fn register(
        registry: Arc<dyn ServiceRegistry>,
        registration: &ServiceRegistration,
        grace: Duration,
    ) -> Result<Self, RegistryError> {
        let handle = registry.register(registration).await?;

        Ok(Self {
            registry,
            service_id: handle.service_id().to_string(),
            handle: Mutex::new(Some(handle)),
            grace,
        })
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Deregister the instance.
    ///
    /// Runs at most once no matter how many callers race here; returns true
    /// for the call that performed it. Failures and timeouts are logged and
    /// swallowed so process exit is never blocked past the grace period.
    pub async fn shutdown(&self) -> bool {
        let handle = match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return false;
        };

        match tokio::time::timeout(self.grace, self.registry.deregister(handle)).await {
            Ok(Ok(())) => {
                tracing::info!(service_id = %self.service_id, "Deregistered from registry");
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    service_id = %self.service_id,
                    error = %e,
                    "Deregistration failed, continuing shutdown"
                );
            }
            Err(_) => {
                tracing::warn!(
                    service_id = %self.service_id,
                    grace = ?self.grace,
                    "Deregistration timed out, continuing shutdown"
                );
            }
        }
        true
    }
}

/// A registered backend service with a bound listener.
pub struct BackendService {
    app: Router,
    listener: TcpListener,
    lifecycle: Arc<ServiceLifecycle>,
}

impl BackendService {
    /// Register with the registry, then bind the listener.
    pub async fn start(
        config: &ServiceConfig,
        registry: Arc<dyn ServiceRegistry>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, StartupError> {
        let registration = ServiceRegistration::from_config(config);
        let grace = Duration::from_secs(config.shutdown.grace_secs);

        let lifecycle = Arc::new(ServiceLifecycle::register(registry, &registration, grace).await?);

        let addr = &config.listener.bind_address;
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                // Registered but never reachable: withdraw the record.
                lifecycle.shutdown().await;
                return Err(StartupError::Bind {
                    addr: addr.clone(),
                    source,
                });
            }
        };

        let app = service_router(
            &config.service.name,
            &config.service.collection,
            &config.health_check.path,
            store,
        );

        Ok(Self {
            app,
            listener,
            lifecycle,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn lifecycle(&self) -> Arc<ServiceLifecycle> {
        self.lifecycle.clone()
    }

    /// Serve until `shutdown` resolves.
    ///
    /// Deregistration runs as soon as shutdown is requested, before in-flight
    /// connections drain, and again (as a no-op) if the server exits on its own.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service_id = %self.lifecycle.service_id(),
            "Service serving"
        );

        let lifecycle = self.lifecycle.clone();
        let result = axum::serve(self.listener, self.app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                lifecycle.shutdown().await;
            })
            .await;

        self.lifecycle.shutdown().await;
        tracing::info!("Service stopped");
        result.map_err(StartupError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;

    fn registration() -> ServiceRegistration {
        ServiceRegistration::from_config(&ServiceConfig::default())
    }

    #[tokio::test]
    async fn test_shutdown_runs_once_under_concurrency() {
        let registry = InMemoryRegistry::new();
        let lifecycle = Arc::new(
            ServiceLifecycle::register(
                Arc::new(registry.clone()),
                &registration(),
                Duration::from_secs(1),
            )
            .await
            .unwrap(),
        );
        assert_eq!(registry.count().await, 1);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                tokio::spawn(async move { lifecycle.shutdown().await })
            })
            .collect();

        let mut performed = 0;
        for task in tasks {
            if task.await.unwrap() {
                performed += 1;
            }
        }

        assert_eq!(performed, 1);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_tolerates_registry_outage() {
        let registry = InMemoryRegistry::new();
        let lifecycle = ServiceLifecycle::register(
            Arc::new(registry.clone()),
            &registration(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        registry.set_available(false);
        assert!(lifecycle.shutdown().await);
        assert!(!lifecycle.shutdown().await);
    }

    #[tokio::test]
    async fn test_register_failure_is_returned() {
        let registry = InMemoryRegistry::new();
        registry.set_available(false);

        let result =
            ServiceLifecycle::register(Arc::new(registry), &registration(), Duration::from_secs(1))
                .await;
        assert!(matches!(result, Err(RegistryError::Unavailable(_))));
    }
}
