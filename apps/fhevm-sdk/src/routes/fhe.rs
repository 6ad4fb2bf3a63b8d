//! `/api/fhe`: client lifecycle operations and status.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{json_body, ApiState};
use crate::error::FhevmError;

#[derive(Deserialize)]
pub struct OperationRequest {
    #[serde(default)]
    operation: Option<String>,
}

#[tracing::instrument(skip(state, payload))]
pub async fn fhe_operation(
    State(state): State<ApiState>,
    payload: Result<Json<OperationRequest>, JsonRejection>,
) -> Result<Json<Value>, FhevmError> {
    let request = json_body(payload)?;
    let client = &state.client;

    match request.operation.as_deref() {
        Some("initialize") => {
            client.initialize().await?;
            Ok(Json(json!({
                "success": true,
                "ready": client.is_ready(),
                "message": "FHEVM client initialized",
            })))
        }
        Some("getPublicKey") => {
            client.initialize().await?;
            Ok(Json(json!({
                "success": true,
                "publicKey": client.public_key_base64(),
            })))
        }
        Some("getNetwork") => Ok(Json(json!({
            "success": true,
            "network": client.get_network(),
        }))),
        _ => Err(FhevmError::InvalidInput("Invalid operation".to_string())),
    }
}

pub async fn fhe_status(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "status": {
            "ready": state.client.is_ready(),
            "network": state.client.get_network(),
        },
    }))
}
