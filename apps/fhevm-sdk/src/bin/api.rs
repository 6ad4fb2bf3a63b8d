//! FHEVM API service
//!
//! Serves the `{operation, data}` JSON routes under `/api` on top of an
//! `FhevmClient` that talks to a gateway and an Ethereum node.

use std::sync::Arc;

use fhevm_sdk::{
    app::build_api_router,
    client::FhevmClient,
    settings::{Service, Settings},
    telemetry,
};
use tokio::sync::Semaphore;

#[tokio::main]
async fn main() {
    telemetry::init_tracing("fhevm-api");

    let settings = Settings::from_env(Service::Api);
    if let Err(message) = settings.validate() {
        tracing::error!("{message}");
        std::process::exit(1);
    }

    let config = match settings.fhevm_config() {
        Ok(config) => config,
        Err(message) => {
            tracing::error!("{message}");
            std::process::exit(1);
        }
    };
    let client = match FhevmClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build FHEVM client");
            std::process::exit(1);
        }
    };
    let client = Arc::new(
        client.with_cpu_limit(Arc::new(Semaphore::new(settings.cpu_concurrency_limit()))),
    );

    // The gateway may start after us; routes retry initialization lazily.
    if let Err(e) = client.initialize().await {
        tracing::warn!(error = %e, "FHEVM client not initialized at startup");
    }

    let network = client.resolved_network().clone();
    let app = build_api_router(&settings, client);
    let addr = settings.socket_addr();
    tracing::info!(
        addr = %addr,
        network = %network.name,
        chain_id = network.chain_id,
        gateway = %network.gateway_url,
        rpc = %network.rpc_url,
        "Starting FHEVM API"
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to bind {addr}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }
    telemetry::shutdown_tracing();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
