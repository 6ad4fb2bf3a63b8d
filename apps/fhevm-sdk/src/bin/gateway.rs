//! FHEVM development gateway
//!
//! Holds the network client key, accepts ciphertext uploads and decrypts
//! handles for authorized users. Intended for local networks.

use std::sync::Arc;

use fhevm_sdk::{
    app::build_gateway_router,
    crypto::KeyStore,
    settings::{Service, Settings},
    storage::Storage,
    telemetry,
};

#[tokio::main]
async fn main() {
    telemetry::init_tracing("fhevm-gateway");

    let settings = Settings::from_env(Service::Gateway);
    if let Err(message) = settings.validate() {
        tracing::error!("{message}");
        std::process::exit(1);
    }
    let chain_id = match settings.gateway_chain_id() {
        Ok(chain_id) => chain_id,
        Err(message) => {
            tracing::error!("{message}");
            std::process::exit(1);
        }
    };

    let keys_dir = settings.keys_dir();
    let keys = match tokio::task::spawn_blocking(move || KeyStore::open(keys_dir)).await {
        Ok(Ok(keys)) => Arc::new(keys),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to load TFHE keys");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "Key loading task failed");
            std::process::exit(1);
        }
    };

    let storage = match settings.db_path() {
        Some(path) => Storage::open(&path),
        None => Storage::open_memory(),
    };
    let storage = match storage {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open storage database");
            std::process::exit(1);
        }
    };

    let app = build_gateway_router(&settings, keys, storage, chain_id);
    let addr = settings.socket_addr();
    tracing::info!(addr = %addr, chain_id, "Starting FHEVM gateway");

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
