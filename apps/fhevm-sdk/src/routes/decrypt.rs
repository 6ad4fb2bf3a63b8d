//! `/api/fhe/decrypt`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{json_body, timestamp_ms, ApiState};
use crate::decryption::decryption_error_message;
use crate::error::FhevmError;
use crate::types::{ClearValue, FheType};

const DEFAULT_TYPE: &str = "euint32";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequest {
    #[serde(default)]
    handle: Option<String>,
    #[serde(default, rename = "type")]
    fhe_type: Option<String>,
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(default)]
    user_address: Option<String>,
}

/// Request validation failures keep their messages. Failures once the
/// gateway is involved are reported with [`decryption_error_message`].
#[tracing::instrument(skip(state, payload))]
pub async fn decrypt_value(
    State(state): State<ApiState>,
    payload: Result<Json<DecryptRequest>, JsonRejection>,
) -> Result<Json<Value>, Response> {
    let request = json_body(payload).map_err(IntoResponse::into_response)?;
    let handle = request
        .handle
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FhevmError::InvalidInput("Encrypted handle is required".to_string()))
        .map_err(IntoResponse::into_response)?;
    let contract = request
        .contract_address
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FhevmError::InvalidInput("Contract address is required".to_string()))
        .map_err(IntoResponse::into_response)?;
    let type_name = request.fhe_type.unwrap_or_else(|| DEFAULT_TYPE.to_string());
    let fhe_type: FheType = type_name.parse().map_err(IntoResponse::into_response)?;

    let value = gateway_decrypt(&state, &handle, fhe_type, &contract, request.user_address)
        .await
        .map_err(|error| {
            let message = decryption_error_message(&error);
            error.into_response_with_message(message)
        })?;

    Ok(Json(json!({
        "success": true,
        "decrypted": {
            "value": value,
            "type": fhe_type,
            "handle": handle,
        },
        "metadata": {
            "timestamp": timestamp_ms(),
        },
    })))
}

async fn gateway_decrypt(
    state: &ApiState,
    handle: &str,
    fhe_type: FheType,
    contract: &str,
    user_address: Option<String>,
) -> Result<ClearValue, FhevmError> {
    let client = &state.client;
    client.initialize().await?;
    let user = user_address.or_else(|| client.signer());
    client
        .decrypt_as(handle, fhe_type, Some(contract), user.as_deref())
        .await
}

pub async fn decrypt_info() -> Json<Value> {
    Json(json!({
        "success": true,
        "description": "FHE Decryption endpoint. POST with { handle, type, contractAddress, userAddress }",
        "note": "Decryption requires proper authorization from the gateway",
    }))
}
