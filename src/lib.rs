//! Service mesh skeleton: a path-prefix edge gateway and the registry
//! lifecycle shared by backend services.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod routing;
pub mod service;

pub use config::{GatewayConfig, ServiceConfig};
pub use http::Gateway;
pub use lifecycle::{BackendService, Shutdown};
pub use registry::{ConsulRegistry, InMemoryRegistry, ServiceRegistry};
