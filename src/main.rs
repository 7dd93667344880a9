//! Edge gateway.
//!
//! ```text
//!                         ┌──────────────────────────────────────┐
//!     Client Request      │               GATEWAY                │
//!     ────────────────────┼─▶ request id ─▶ route table ─┐       │
//!                         │                 (prefix scan) │       │     /users/*
//!                         │                    404 ◀──────┤       │  ┌───────────────┐
//!                         │                               ▼       │  │ user-service  │
//!     Client Response     │                          forwarder ───┼─▶├───────────────┤
//!     ◀───────────────────┼──── streamed response ◀── (timeout) ◀─┼──│product-service│
//!                         │                      502 / 504        │  └───────────────┘
//!                         └──────────────────────────────────────┘     /products/*
//! ```
//!
//! Routes are static configuration. Backends register themselves with the
//! registry independently; the gateway never consults it.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use service_mesh::config::load_gateway_config;
use service_mesh::lifecycle::{termination_signal, Shutdown};
use service_mesh::observability::{init_logging, metrics};
use service_mesh::Gateway;

#[derive(Parser)]
#[command(name = "mesh-gateway")]
#[command(about = "Path-prefix edge gateway", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults and MESH_* variables apply without it.
    #[arg(short, long, env = "MESH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_gateway_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mesh-gateway: configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mesh-gateway starting");

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: service_mesh::GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Initializing: every route must compile before anything is bound.
    let bind_address = config.listener.bind_address.clone();
    let gateway = Gateway::initialize(config)?;

    let listener = TcpListener::bind(&bind_address).await?;

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            termination_signal().await;
            shutdown.trigger();
        }
    });

    // Serving
    gateway.serve(listener, server_shutdown).await?;
    Ok(())
}
