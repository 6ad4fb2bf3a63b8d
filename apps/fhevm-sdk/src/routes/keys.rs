//! `/api/keys`: public key lookup and EIP-712 decryption authorization.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{json_body, ApiState};
use crate::eip712::decrypt_authorization;
use crate::error::FhevmError;
use crate::types::Handle;

const AVAILABLE_OPERATIONS: [&str; 2] = ["publicKey", "networkKeys"];

#[derive(Debug, Deserialize)]
pub struct KeysQuery {
    operation: Option<String>,
}

#[tracing::instrument(skip(state))]
pub async fn keys_lookup(
    State(state): State<ApiState>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<Value>, FhevmError> {
    let client = &state.client;
    let body = match query.operation.as_deref() {
        Some("publicKey") => {
            client.initialize().await?;
            json!({
                "success": true,
                "publicKey": client.public_key_base64(),
                "keyType": "FHE Public Key",
                "usage": "Used for client-side encryption",
            })
        }
        Some("networkKeys") => json!({
            "success": true,
            "network": client.get_network(),
            "description": "Network key information",
        }),
        _ => json!({
            "success": true,
            "availableOperations": AVAILABLE_OPERATIONS,
            "description": "Key management endpoint",
            "usage": "GET /api/keys?operation={operation}",
        }),
    };
    Ok(Json(body))
}

#[derive(Deserialize)]
pub struct KeysRequest {
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    data: Option<AuthorizationData>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationData {
    user_address: Option<String>,
    contract_address: Option<String>,
    handle: Option<String>,
}

#[tracing::instrument(skip(state, payload))]
pub async fn keys_operation(
    State(state): State<ApiState>,
    payload: Result<Json<KeysRequest>, JsonRejection>,
) -> Result<Json<Value>, FhevmError> {
    let request = json_body(payload)?;
    if request.operation.as_deref() != Some("generateEIP712Signature") {
        return Err(FhevmError::InvalidInput("Invalid operation".to_string()));
    }

    let data = request.data.unwrap_or_default();
    let (Some(user), Some(contract)) = (
        data.user_address.filter(|value| !value.is_empty()),
        data.contract_address.filter(|value| !value.is_empty()),
    ) else {
        return Err(FhevmError::InvalidInput(
            "userAddress and contractAddress are required".to_string(),
        ));
    };

    let handle = match data.handle.as_deref().filter(|value| !value.is_empty()) {
        Some(handle) => handle.parse::<Handle>()?,
        None => Handle::new([0u8; 32]),
    };
    let typed = decrypt_authorization(&user, &contract, &handle, state.client.chain_id())?;
    let digest = typed.digest_hex();

    Ok(Json(json!({
        "success": true,
        "signatureStructure": typed,
        "digest": digest,
        "note": "Sign this with the user wallet to authorize decryption",
    })))
}
