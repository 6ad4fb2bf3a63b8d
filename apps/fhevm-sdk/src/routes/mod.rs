//! HTTP route handlers for the API service and the development gateway.

pub mod compute;
pub mod decrypt;
pub mod encrypt;
pub mod fhe;
pub mod gateway;
mod health;
pub mod keys;

pub use health::{build_info, health};

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use tokio::sync::Semaphore;

use crate::client::FhevmClient;
use crate::crypto::KeyStore;
use crate::error::FhevmError;
use crate::storage::Storage;

/// Shared state for `fhevm-api`.
#[derive(Clone)]
pub struct ApiState {
    pub client: Arc<FhevmClient>,
}

/// Shared state for `fhevm-gateway`.
#[derive(Clone)]
pub struct GatewayState {
    pub keys: Arc<KeyStore>,
    pub storage: Storage,
    pub chain_id: u64,
    pub cpu_permits: Arc<Semaphore>,
}

/// Unwrap a JSON body, turning extractor rejections into envelope errors.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, FhevmError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| FhevmError::InvalidInput(rejection.body_text()))
}

pub(crate) fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
