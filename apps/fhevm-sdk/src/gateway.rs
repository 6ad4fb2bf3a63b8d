//! Gateway HTTP client and the wire types shared with the development gateway.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::INTERNAL_TOKEN_HEADER;
use crate::error::FhevmError;
use crate::transport::{encode_msgpack_gzip, MSGPACK_CONTENT_TYPE};
use crate::types::EncryptedValue;

const GATEWAY_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptRequest {
    pub handle: String,
    #[serde(rename = "type")]
    pub fhe_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub value: Value,
}

/// Ciphertext upload so the gateway can later decrypt `handle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputUpload {
    pub handle: String,
    #[serde(rename = "type")]
    pub fhe_type: String,
    #[serde(with = "serde_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(default)]
    pub user_address: Option<String>,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAck {
    pub handle: String,
}

#[derive(Clone, Debug)]
pub struct GatewayClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self, FhevmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(GATEWAY_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FhevmError::Gateway(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token: None,
        })
    }

    /// Send `x-fhevm-internal-token` with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|value| !value.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.as_deref() {
            Some(token) => request.header(INTERNAL_TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn check(response: Response, action: &str) -> Result<Response, FhevmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string));
        debug!(%status, ?detail, "gateway {action} rejected");

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FhevmError::Unauthorized(
                detail.unwrap_or_else(|| status.to_string()),
            )),
            _ => Err(FhevmError::Gateway(match detail {
                Some(detail) => format!("{action} failed: {status}: {detail}"),
                None => format!("{action} failed: {status}"),
            })),
        }
    }

    /// Fetch the network public key (base64 bincode).
    pub async fn public_key(&self) -> Result<String, FhevmError> {
        let response = self
            .authorized(self.client.get(self.url("/publicKey")))
            .send()
            .await?;
        let body: PublicKeyResponse = Self::check(response, "Public key fetch")
            .await?
            .json()
            .await?;
        Ok(body.public_key)
    }

    pub async fn decrypt(&self, request: &DecryptRequest) -> Result<Value, FhevmError> {
        let response = self
            .authorized(self.client.post(self.url("/decrypt")))
            .json(request)
            .send()
            .await?;
        let body: DecryptResponse = Self::check(response, "Decryption")
            .await?
            .json()
            .await?;
        Ok(body.value)
    }

    pub async fn submit_input(
        &self,
        encrypted: &EncryptedValue,
        user_address: Option<&str>,
        chain_id: u64,
    ) -> Result<(), FhevmError> {
        let upload = InputUpload {
            handle: encrypted.handle.to_hex(),
            fhe_type: encrypted.fhe_type.to_string(),
            ciphertext: encrypted.ciphertext.clone(),
            user_address: user_address.map(str::to_string),
            chain_id,
        };
        let body = encode_msgpack_gzip(&upload)?;
        let response = self
            .authorized(self.client.post(self.url("/inputs")))
            .header(reqwest::header::CONTENT_TYPE, MSGPACK_CONTENT_TYPE)
            .header(reqwest::header::CONTENT_ENCODING, "gzip")
            .body(body)
            .send()
            .await?;
        Self::check(response, "Input submission").await?;
        Ok(())
    }
}
