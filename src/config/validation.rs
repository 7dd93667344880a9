//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Validation is a pure
//! function over the parsed config and reports every problem, not just the
//! first one.

use thiserror::Error;

use crate::config::schema::{GatewayConfig, ServiceConfig};
use crate::routing::{PathPrefixMatcher, Upstream};

/// A single semantic problem found in a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("routes: at least one route is required")]
    NoRoutes,

    #[error("route '{route}': {reason}")]
    InvalidRoute { route: String, reason: String },

    #[error("{field}: must not be empty")]
    Empty { field: &'static str },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: invalid value '{value}'")]
    Invalid { field: &'static str, value: String },
}

/// Validate a gateway configuration.
pub fn validate_gateway(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind_address(&config.listener.bind_address, &mut errors);

    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
    }

    for (i, route) in config.routes.iter().enumerate() {
        let label = if route.name.is_empty() {
            format!("#{}", i)
        } else {
            route.name.clone()
        };

        if let Err(e) = PathPrefixMatcher::parse(&route.path_prefix) {
            errors.push(ValidationError::InvalidRoute {
                route: label.clone(),
                reason: e.to_string(),
            });
        }
        if let Err(e) = Upstream::parse(&route.target) {
            errors.push(ValidationError::InvalidRoute {
                route: label,
                reason: e.to_string(),
            });
        }
    }

    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.upstream_secs" });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.connect_secs" });
    }

    finish(errors)
}

/// Validate a backend service configuration.
pub fn validate_service(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind_address(&config.listener.bind_address, &mut errors);

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "service.name" });
    }
    if config.service.address.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "service.address" });
    }
    if config.service.port == 0 {
        errors.push(ValidationError::Zero { field: "service.port" });
    }
    if config.service.collection.trim().is_empty()
        || config.service.collection.contains('/')
    {
        errors.push(ValidationError::Invalid {
            field: "service.collection",
            value: config.service.collection.clone(),
        });
    }

    match url::Url::parse(&config.registry.address) {
        Ok(u) if u.has_host() && matches!(u.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::Invalid {
            field: "registry.address",
            value: config.registry.address.clone(),
        }),
    }
    if config.registry.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "registry.timeout_secs" });
    }

    let collection_root = format!("/{}/", config.service.collection);
    if !config.health_check.path.starts_with('/')
        || config.health_check.path.starts_with(&collection_root)
        || config.health_check.path.contains(['{', '}', '*'])
    {
        errors.push(ValidationError::Invalid {
            field: "health_check.path",
            value: config.health_check.path.clone(),
        });
    }
    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "health_check.interval_secs" });
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "health_check.timeout_secs" });
    }
    if config.shutdown.grace_secs == 0 {
        errors.push(ValidationError::Zero { field: "shutdown.grace_secs" });
    }

    finish(errors)
}

fn check_bind_address(addr: &str, errors: &mut Vec<ValidationError>) {
    if addr.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::Invalid {
            field: "listener.bind_address",
            value: addr.to_string(),
        });
    }
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
