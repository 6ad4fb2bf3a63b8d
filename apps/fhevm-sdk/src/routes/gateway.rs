//! Development gateway: public key distribution, ciphertext intake and
//! authorized decryption.
//!
//! Ownership is checked against the `userAddress` the caller declares. No
//! signature is verified, so anyone who knows the owner's address can
//! decrypt its values. Only run this gateway against test data.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::{json_body, timestamp_ms, GatewayState};
use crate::crypto::{decrypt_ciphertext, run_cpu_bound, verify_handle};
use crate::error::FhevmError;
use crate::gateway::{DecryptRequest, DecryptResponse, InputAck, InputUpload, PublicKeyResponse};
use crate::storage::StoredInput;
use crate::transport;
use crate::types::{FheType, Handle};
use crate::validation::{is_decryption_authorized, is_valid_address};

pub async fn public_key(State(state): State<GatewayState>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.keys.public_key_b64().to_string(),
    })
}

#[tracing::instrument(skip(state, headers, body), fields(request_bytes = body.len()))]
pub async fn submit_input(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InputAck>, FhevmError> {
    let upload: InputUpload = transport::decode_msgpack(&headers, body)?;
    let handle: Handle = upload.handle.parse()?;
    let fhe_type: FheType = upload.fhe_type.parse()?;

    if upload.chain_id != state.chain_id {
        return Err(FhevmError::InvalidInput(format!(
            "invalid handle: bound to chain {}, gateway serves chain {}",
            upload.chain_id, state.chain_id
        )));
    }
    verify_handle(&handle, &upload.ciphertext, fhe_type, upload.chain_id)?;
    if let Some(owner) = upload.user_address.as_deref() {
        if !is_valid_address(owner) {
            return Err(FhevmError::InvalidInput(format!("Invalid user address: {owner}")));
        }
    }

    let stored = StoredInput {
        fhe_type,
        ciphertext: upload.ciphertext,
        owner: upload.user_address,
        chain_id: upload.chain_id,
        stored_at: timestamp_ms(),
    };
    let storage = state.storage.clone();
    tokio::task::spawn_blocking(move || storage.put_input(&handle, &stored))
        .await
        .map_err(|error| FhevmError::Internal(format!("storage task failed: {error}")))??;

    tracing::info!(%handle, %fhe_type, "ciphertext registered");
    Ok(Json(InputAck {
        handle: handle.to_hex(),
    }))
}

#[tracing::instrument(skip(state, payload))]
pub async fn decrypt(
    State(state): State<GatewayState>,
    payload: Result<Json<DecryptRequest>, JsonRejection>,
) -> Result<Json<DecryptResponse>, FhevmError> {
    let request = json_body(payload)?;
    let handle: Handle = request.handle.parse()?;
    let fhe_type: FheType = request.fhe_type.parse()?;

    let storage = state.storage.clone();
    let stored = tokio::task::spawn_blocking(move || storage.get_input(&handle))
        .await
        .map_err(|error| FhevmError::Internal(format!("storage task failed: {error}")))??
        .ok_or_else(|| FhevmError::NotFound(format!("unknown handle {handle}")))?;

    if stored.fhe_type != fhe_type {
        return Err(FhevmError::InvalidInput(format!(
            "type mismatch: {handle} holds {}, requested {fhe_type}",
            stored.fhe_type
        )));
    }
    if let Some(owner) = stored.owner.as_deref() {
        let authorized = request
            .user_address
            .as_deref()
            .is_some_and(|user| is_decryption_authorized(user, owner));
        if !authorized {
            return Err(FhevmError::Unauthorized(format!(
                "caller may not decrypt {handle}"
            )));
        }
    }

    let keys = Arc::clone(&state.keys);
    let clear = run_cpu_bound(Some(state.cpu_permits.as_ref()), move || {
        decrypt_ciphertext(&stored.ciphertext, fhe_type, keys.client_key())
    })
    .await?;

    Ok(Json(DecryptResponse {
        value: clear.to_json(),
    }))
}
