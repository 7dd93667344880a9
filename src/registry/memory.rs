//! In-memory registry (for testing and local development).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::registry::{RegistryError, RegistryHandle, ServiceRegistration, ServiceRegistry};

/// Process-local registry with the same upsert semantics as Consul.
#[derive(Clone)]
pub struct InMemoryRegistry {
    services: Arc<RwLock<HashMap<String, ServiceRegistration>>>,
    available: Arc<AtomicBool>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            services: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate the registry going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Look up a registration by service ID.
    pub async fn get(&self, service_id: &str) -> Option<ServiceRegistration> {
        self.services.read().await.get(service_id).cloned()
    }

    /// Number of registered instances.
    pub async fn count(&self) -> usize {
        self.services.read().await.len()
    }

    fn ensure_available(&self) -> Result<(), RegistryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RegistryError::Unavailable("in-memory registry offline".into()))
        }
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryRegistry {
    async fn register(
        &self,
        registration: &ServiceRegistration,
    ) -> Result<RegistryHandle, RegistryError> {
        self.ensure_available()?;

        let previous = self
            .services
            .write()
            .await
            .insert(registration.id.clone(), registration.clone());

        if previous.is_some() {
            tracing::debug!(service_id = %registration.id, "Replaced existing registration");
        }
        Ok(RegistryHandle::new(registration.id.clone()))
    }

    async fn deregister(&self, handle: RegistryHandle) -> Result<(), RegistryError> {
        self.ensure_available()?;

        self.services
            .write()
            .await
            .remove(handle.service_id())
            .ok_or_else(|| RegistryError::NotRegistered(handle.service_id().to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;

    fn registration() -> ServiceRegistration {
        ServiceRegistration::from_config(&ServiceConfig::default())
    }

    #[tokio::test]
    async fn test_register_then_deregister_leaves_nothing() {
        let registry = InMemoryRegistry::new();

        let handle = registry.register(&registration()).await.unwrap();
        assert_eq!(handle.service_id(), "user-service");
        assert_eq!(registry.count().await, 1);

        registry.deregister(handle).await.unwrap();
        assert_eq!(registry.count().await, 0);
        assert!(registry.get("user-service").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_upserts() {
        let registry = InMemoryRegistry::new();
        let first = registration();
        let mut second = registration();
        second.port = 9001;

        registry.register(&first).await.unwrap();
        let handle = registry.register(&second).await.unwrap();

        assert_eq!(registry.count().await, 1);
        assert_eq!(registry.get("user-service").await.unwrap().port, 9001);

        registry.deregister(handle).await.unwrap();
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_deregister_unknown() {
        let registry = InMemoryRegistry::new();
        let err = registry
            .deregister(RegistryHandle::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotRegistered(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let registry = InMemoryRegistry::new();
        registry.set_available(false);

        assert!(matches!(
            registry.register(&registration()).await,
            Err(RegistryError::Unavailable(_))
        ));
        assert_eq!(registry.count().await, 0);
    }
}
