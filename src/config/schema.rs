//! Configuration schema definitions.
//!
//! This module defines the configuration structures for the gateway and for
//! each backend service. All types derive Serde traits for deserialization
//! from TOML files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Ordered route table mapping path prefixes to backends.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration for forwarded calls.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::with_address("0.0.0.0:8000"),
            routes: vec![
                RouteConfig::new("users", "/users/*", "http://user-service:8001"),
                RouteConfig::new("products", "/products/*", "http://product-service:8002"),
            ],
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Root configuration for a backend service process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Identity announced to the registry.
    pub service: ServiceIdentity,

    /// Registry agent connection settings.
    pub registry: RegistryConfig,

    /// Health check declared alongside the registration.
    pub health_check: HealthCheckConfig,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::with_address("0.0.0.0:8001"),
            service: ServiceIdentity::default(),
            registry: RegistryConfig::default(),
            health_check: HealthCheckConfig::default(),
            shutdown: ShutdownConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl ListenerConfig {
    fn with_address(addr: &str) -> Self {
        Self {
            bind_address: addr.to_string(),
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::with_address("0.0.0.0:8000")
    }
}

/// A single entry of the gateway route table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    #[serde(default)]
    pub name: String,

    /// Path prefix pattern, e.g. "/users/*".
    pub path_prefix: String,

    /// Backend base URL, e.g. "http://user-service:8001".
    pub target: String,
}

impl RouteConfig {
    pub fn new(
        name: impl Into<String>,
        path_prefix: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path_prefix: path_prefix.into(),
            target: target.into(),
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for a backend to produce response headers, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// Identity of a backend service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceIdentity {
    /// Unique instance ID. Defaults to the service name when empty.
    pub id: String,

    /// Logical service name used for discovery.
    pub name: String,

    /// Host the registry (and the gateway) can reach this instance on.
    pub address: String,

    /// Port the registry can reach this instance on.
    pub port: u16,

    /// Record collection served under `/<collection>/`.
    pub collection: String,
}

impl ServiceIdentity {
    /// The instance ID announced to the registry.
    pub fn instance_id(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: "user-service".to_string(),
            address: "user-service".to_string(),
            port: 8001,
            collection: "users".to_string(),
        }
    }
}

/// Registry agent connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL of the registry agent (e.g., "http://consul:8500").
    pub address: String,

    /// Timeout for a single registry call in seconds.
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: "http://consul:8500".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Health check declared to the registry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path probed by the registry.
    pub path: String,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Let the registry reap the instance after it stays critical this long.
    pub deregister_critical_after_secs: Option<u64>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            interval_secs: 10,
            timeout_secs: 1,
            deregister_critical_after_secs: None,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Upper bound on the shutdown hook (deregistration) in seconds.
    pub grace_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_secs: 5 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
