//! Registration records and handles.

use std::fmt;
use std::time::Duration;

use crate::config::ServiceConfig;

/// HTTP health check the registry runs against the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// Absolute URL probed with GET.
    pub http: String,
    pub interval: Duration,
    pub timeout: Duration,
    /// Reap the instance after it has been critical for this long.
    pub deregister_critical_after: Option<Duration>,
}

/// The record a service instance announces about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistration {
    /// Unique per instance.
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub check: HealthCheck,
}

impl ServiceRegistration {
    /// Build the registration from static service configuration.
    ///
    /// The health URL is derived from the announced address and port, so
    /// the registry probes the same endpoint discovery hands out.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let identity = &config.service;
        let check = &config.health_check;

        Self {
            id: identity.instance_id().to_string(),
            name: identity.name.clone(),
            address: identity.address.clone(),
            port: identity.port,
            check: HealthCheck {
                http: format!("http://{}:{}{}", identity.address, identity.port, check.path),
                interval: Duration::from_secs(check.interval_secs),
                timeout: Duration::from_secs(check.timeout_secs),
                deregister_critical_after: check
                    .deregister_critical_after_secs
                    .map(Duration::from_secs),
            },
        }
    }
}

/// Proof that an instance is registered.
///
/// Not `Clone`: `deregister` consumes it, so one registration is removed at
/// most once.
#[derive(Debug, PartialEq, Eq)]
pub struct RegistryHandle {
    service_id: String,
}

impl RegistryHandle {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }
}

impl fmt::Display for RegistryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.service_id)
    }
}
