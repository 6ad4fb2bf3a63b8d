//! Router construction for the API service and the development gateway.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::sync::Semaphore;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::client::FhevmClient;
use crate::crypto::KeyStore;
use crate::storage::Storage;
use crate::{
    auth::internal_auth,
    routes::{self, ApiState, GatewayState},
    settings::Settings,
};

fn with_service_layers<S>(router: Router<S>, settings: &Settings) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(middleware::from_fn_with_state(
            settings.internal_token(),
            internal_auth,
        ))
        .layer(DefaultBodyLimit::max(settings.body_limit_bytes()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            settings.request_timeout(),
        ))
        .layer(ConcurrencyLimitLayer::new(settings.concurrency_limit()))
        .layer(TraceLayer::new_for_http())
}

/// `fhevm-api`: the `{operation, data}` envelope routes over an [`FhevmClient`].
pub fn build_api_router(settings: &Settings, client: Arc<FhevmClient>) -> Router {
    let router = Router::new()
        .route("/health", get(routes::health))
        .route("/build-info", get(routes::build_info))
        .route(
            "/api/fhe",
            post(routes::fhe::fhe_operation).get(routes::fhe::fhe_status),
        )
        .route(
            "/api/keys",
            get(routes::keys::keys_lookup).post(routes::keys::keys_operation),
        )
        .route(
            "/api/fhe/encrypt",
            post(routes::encrypt::encrypt_value).get(routes::encrypt::encrypt_info),
        )
        .route(
            "/api/fhe/decrypt",
            post(routes::decrypt::decrypt_value).get(routes::decrypt::decrypt_info),
        )
        .route(
            "/api/fhe/compute",
            post(routes::compute::compute).get(routes::compute::compute_info),
        );

    with_service_layers(router, settings).with_state(ApiState { client })
}

/// `fhevm-gateway`: key distribution, ciphertext intake, decryption.
pub fn build_gateway_router(
    settings: &Settings,
    keys: Arc<KeyStore>,
    storage: Storage,
    chain_id: u64,
) -> Router {
    let state = GatewayState {
        keys,
        storage,
        chain_id,
        cpu_permits: Arc::new(Semaphore::new(settings.cpu_concurrency_limit())),
    };

    let router = Router::new()
        .route("/health", get(routes::health))
        .route("/build-info", get(routes::build_info))
        .route("/publicKey", get(routes::gateway::public_key))
        .route("/inputs", post(routes::gateway::submit_input))
        .route("/decrypt", post(routes::gateway::decrypt));

    with_service_layers(router, settings).with_state(state)
}
