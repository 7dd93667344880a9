//! Backend service process.
//!
//! Registers with the registry, serves its health endpoint and record
//! collection, and deregisters on SIGTERM/SIGINT. If registration fails the
//! process exits non-zero without ever binding its port.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use service_mesh::config::load_service_config;
use service_mesh::lifecycle::{termination_signal, BackendService};
use service_mesh::observability::{init_logging, metrics};
use service_mesh::registry::ConsulRegistry;
use service_mesh::service::InMemoryRecordStore;

#[derive(Parser)]
#[command(name = "mesh-service")]
#[command(about = "Registry-aware backend service", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults and MESH_* variables apply without it.
    #[arg(short, long, env = "MESH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_service_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mesh-service: configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service.name,
        registry = %config.registry.address,
        "mesh-service starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = match ConsulRegistry::new(&config.registry) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            return ExitCode::FAILURE;
        }
    };

    let service =
        match BackendService::start(&config, registry, Arc::new(InMemoryRecordStore::new())).await {
            Ok(service) => service,
            Err(e) => {
                tracing::error!(error = %e, "Fatal startup error");
                return ExitCode::FAILURE;
            }
        };

    let shutdown = async {
        termination_signal().await;
    };

    match service.serve(shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
