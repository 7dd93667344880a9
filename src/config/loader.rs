//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, RouteConfig, ServiceConfig};
use crate::config::validation::{validate_gateway, validate_service, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid environment variable {name}: '{value}'")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the process environment, and validate the gateway config.
///
/// Without a path the built-in defaults are used as the base.
pub fn load_gateway_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config: GatewayConfig = read_or_default(path)?;
    apply_gateway_env(&mut config, |k| std::env::var(k).ok())?;
    validate_gateway(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load, override from the process environment, and validate a service config.
pub fn load_service_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config: ServiceConfig = read_or_default(path)?;
    apply_service_env(&mut config, |k| std::env::var(k).ok())?;
    validate_service(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, ConfigError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        }
        None => Ok(T::default()),
    }
}

/// Apply `MESH_*` overrides to a gateway config.
///
/// `MESH_ROUTES` replaces the whole route table and takes the form
/// `/users/*=http://user-service:8001,/products/*=http://product-service:8002`.
pub fn apply_gateway_env<F>(config: &mut GatewayConfig, var: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = var("MESH_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }

    if let Some(routes) = var("MESH_ROUTES") {
        let mut table = Vec::new();
        for entry in routes.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (prefix, target) = entry.split_once('=').ok_or_else(|| ConfigError::Env {
                name: "MESH_ROUTES",
                value: entry.to_string(),
            })?;
            let prefix = prefix.trim();
            let name = prefix
                .trim_matches(|c| c == '/' || c == '*')
                .to_string();
            table.push(RouteConfig::new(name, prefix, target.trim()));
        }
        config.routes = table;
    }

    if let Some(secs) = var("MESH_UPSTREAM_TIMEOUT_SECS") {
        config.timeouts.upstream_secs = parse_env("MESH_UPSTREAM_TIMEOUT_SECS", secs)?;
    }

    if let Some(level) = var("MESH_LOG_LEVEL") {
        config.observability.log_level = level;
    }

    Ok(())
}

/// Apply `MESH_*` overrides to a service config.
pub fn apply_service_env<F>(config: &mut ServiceConfig, var: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = var("MESH_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(id) = var("MESH_SERVICE_ID") {
        config.service.id = id;
    }
    if let Some(name) = var("MESH_SERVICE_NAME") {
        config.service.name = name;
    }
    if let Some(address) = var("MESH_SERVICE_ADDRESS") {
        config.service.address = address;
    }
    if let Some(port) = var("MESH_SERVICE_PORT") {
        config.service.port = parse_env("MESH_SERVICE_PORT", port)?;
    }
    if let Some(collection) = var("MESH_SERVICE_COLLECTION") {
        config.service.collection = collection;
    }
    if let Some(registry) = var("MESH_REGISTRY_ADDRESS") {
        config.registry.address = registry;
    }
    if let Some(level) = var("MESH_LOG_LEVEL") {
        config.observability.log_level = level;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { name, value })
}
