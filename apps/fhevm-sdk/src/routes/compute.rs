//! `/api/fhe/compute`: homomorphic operations executed by a contract.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{json_body, timestamp_ms, ApiState};
use crate::abi::Abi;
use crate::error::FhevmError;
use crate::types::ContractCallOptions;

pub const SUPPORTED_OPERATIONS: [&str; 4] = ["add", "subtract", "multiply", "compare"];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeRequest {
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    operands: Option<Vec<Value>>,
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(default)]
    abi: Option<Value>,
}

#[tracing::instrument(skip(state, payload))]
pub async fn compute(
    State(state): State<ApiState>,
    payload: Result<Json<ComputeRequest>, JsonRejection>,
) -> Result<Json<Value>, FhevmError> {
    let request = json_body(payload)?;
    let (Some(operation), Some(operands)) = (
        request.operation.filter(|value| !value.is_empty()),
        request.operands,
    ) else {
        return Err(FhevmError::InvalidInput(
            "Operation and operands array are required".to_string(),
        ));
    };
    let (Some(contract_address), Some(abi)) = (
        request.contract_address.filter(|value| !value.is_empty()),
        request.abi,
    ) else {
        return Err(FhevmError::InvalidInput(
            "Contract address and ABI are required".to_string(),
        ));
    };
    if !SUPPORTED_OPERATIONS.contains(&operation.as_str()) {
        return Err(FhevmError::InvalidInput(format!(
            "Unsupported operation: {operation}"
        )));
    }

    let contract = state
        .client
        .get_contract(&contract_address, Abi::from_json(&abi)?)?;
    let receipt = contract
        .write(&operation, &operands, &ContractCallOptions::default())
        .await?;

    Ok(Json(json!({
        "success": true,
        "result": {
            "operation": operation,
            "transactionHash": receipt.hash,
            "blockNumber": receipt.block_number,
        },
        "metadata": {
            "timestamp": timestamp_ms(),
        },
    })))
}

pub async fn compute_info() -> Json<Value> {
    Json(json!({
        "success": true,
        "supportedOperations": SUPPORTED_OPERATIONS,
        "description": "FHE Computation endpoint. POST with { operation, operands, contractAddress, abi }",
        "example": {
            "operation": "add",
            "operands": ["0x1234...", "0x5678..."],
            "contractAddress": "0xabc...",
            "abi": [],
        },
    }))
}
