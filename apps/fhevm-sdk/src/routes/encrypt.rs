//! `/api/fhe/encrypt`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{json_body, timestamp_ms, ApiState};
use crate::error::FhevmError;
use crate::types::FheType;
use crate::validation::is_valid_address;

const DEFAULT_TYPE: &str = "euint32";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptRequest {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default, rename = "type")]
    fhe_type: Option<String>,
    #[serde(default)]
    contract_address: Option<String>,
}

#[tracing::instrument(skip(state, payload))]
pub async fn encrypt_value(
    State(state): State<ApiState>,
    payload: Result<Json<EncryptRequest>, JsonRejection>,
) -> Result<Json<Value>, FhevmError> {
    let request = json_body(payload)?;
    let value = request
        .value
        .ok_or_else(|| FhevmError::InvalidInput("Value is required".to_string()))?;
    let type_name = request.fhe_type.unwrap_or_else(|| DEFAULT_TYPE.to_string());
    let fhe_type: FheType = type_name.parse()?;
    if let Some(address) = request.contract_address.as_deref() {
        if !is_valid_address(address) {
            return Err(FhevmError::InvalidInput("Invalid contract address".to_string()));
        }
    }

    state.client.initialize().await?;
    let encrypted = state.client.encrypt(&value, fhe_type).await?;

    Ok(Json(json!({
        "success": true,
        "encrypted": {
            "data": encrypted.input_proof(),
            "type": encrypted.fhe_type,
            "handle": encrypted.handle,
        },
        "metadata": {
            "originalType": type_name,
            "timestamp": timestamp_ms(),
        },
    })))
}

pub async fn encrypt_info() -> Json<Value> {
    let supported: Vec<&str> = FheType::ALL.iter().map(|ty| ty.as_str()).collect();
    Json(json!({
        "success": true,
        "supportedTypes": supported,
        "description": "FHE Encryption endpoint. POST with { value, type, contractAddress }",
    }))
}
