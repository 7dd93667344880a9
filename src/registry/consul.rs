//! Consul agent registry client.
//!
//! Speaks the agent HTTP API:
//! - `PUT /v1/agent/service/register` with the service definition
//! - `PUT /v1/agent/service/deregister/<id>`

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::config::RegistryConfig;
use crate::observability::metrics;
use crate::registry::{RegistryError, RegistryHandle, ServiceRegistration, ServiceRegistry};

/// Client for a Consul agent.
#[derive(Clone)]
pub struct ConsulRegistry {
    base: Url,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    address: &'a str,
    port: u16,
    check: AgentServiceCheck<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceCheck<'a> {
    #[serde(rename = "HTTP")]
    http: &'a str,
    interval: String,
    timeout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    deregister_critical_service_after: Option<String>,
}

impl<'a> From<&'a ServiceRegistration> for AgentServiceRegistration<'a> {
    fn from(r: &'a ServiceRegistration) -> Self {
        Self {
            id: &r.id,
            name: &r.name,
            address: &r.address,
            port: r.port,
            check: AgentServiceCheck {
                http: &r.check.http,
                interval: consul_duration(r.check.interval),
                timeout: consul_duration(r.check.timeout),
                deregister_critical_service_after: r
                    .check
                    .deregister_critical_after
                    .map(consul_duration),
            },
        }
    }
}

/// Consul duration strings: "10s", or "1500ms" when not whole seconds.
fn consul_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

impl ConsulRegistry {
    /// Create a client for the agent at `config.address`.
    ///
    /// Every call is bounded by `config.timeout_secs` so startup and
    /// shutdown fail fast when the agent is unreachable. The agent is a
    /// local sidecar, so environment proxies are ignored.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let base = Url::parse(&config.address)
            .ok()
            .filter(|u| u.has_host() && !u.cannot_be_a_base())
            .ok_or_else(|| RegistryError::InvalidAddress(config.address.clone()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .no_proxy()
            .build()?;

        Ok(Self { base, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn put(
        &self,
        operation: &'static str,
        url: Url,
        body: Option<&AgentServiceRegistration<'_>>,
    ) -> Result<(), RegistryError> {
        let mut request = self.client.put(url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(RegistryError::Rejected {
            operation,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ServiceRegistry for ConsulRegistry {
    async fn register(
        &self,
        registration: &ServiceRegistration,
    ) -> Result<RegistryHandle, RegistryError> {
        let url = self.endpoint(&["v1", "agent", "service", "register"]);
        let payload = AgentServiceRegistration::from(registration);

        let result = self.put("register", url, Some(&payload)).await;
        metrics::record_registry_operation("register", result.is_ok());
        result?;

        tracing::info!(
            service_id = %registration.id,
            service = %registration.name,
            address = %registration.address,
            port = registration.port,
            check = %registration.check.http,
            "Registered service with Consul"
        );
        Ok(RegistryHandle::new(registration.id.clone()))
    }

    async fn deregister(&self, handle: RegistryHandle) -> Result<(), RegistryError> {
        let url = self.endpoint(&["v1", "agent", "service", "deregister", handle.service_id()]);

        let result = self.put("deregister", url, None).await;
        metrics::record_registry_operation("deregister", result.is_ok());
        result?;

        tracing::info!(service_id = %handle, "Deregistered service from Consul");
        Ok(())
    }
}
