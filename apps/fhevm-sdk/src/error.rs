//! Error types for FHEVM operations

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FhevmError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("FHEVM instance not initialized")]
    NotReady,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("TFHE error: {0}")]
    Tfhe(String),

    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Msgpack decode error: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),

    #[error("Msgpack encode error: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type FhevmResult<T> = Result<T, FhevmError>;

impl FhevmError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_)
            | Self::UnsupportedType(_)
            | Self::Abi(_)
            | Self::Bincode(_)
            | Self::Base64(_)
            | Self::MsgpackDecode(_)
            | Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Gateway(_) | Self::Rpc(_) => StatusCode::BAD_GATEWAY,
            Self::Tfhe(_)
            | Self::MsgpackEncode(_)
            | Self::Io(_)
            | Self::Storage(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidInput(_) => Some("INVALID_INPUT"),
            Self::UnsupportedType(_) => Some("UNSUPPORTED_TYPE"),
            Self::NotReady => Some("NOT_READY"),
            Self::Unauthorized(_) => Some("UNAUTHORIZED"),
            Self::NotFound(_) => Some("NOT_FOUND"),
            Self::Gateway(_) => Some("GATEWAY_ERROR"),
            Self::Rpc(_) => Some("RPC_ERROR"),
            Self::Abi(_) => Some("ABI_ERROR"),
            Self::Tfhe(_) => Some("TFHE_ERROR"),
            Self::Bincode(_) | Self::Base64(_) | Self::MsgpackDecode(_) | Self::Json(_) => {
                Some("DESERIALIZATION_ERROR")
            }
            Self::MsgpackEncode(_) | Self::Io(_) | Self::Storage(_) | Self::Internal(_) => None,
        }
    }

    /// Respond with `message` in place of the error text. Status and code
    /// still follow the error kind, and the full error is logged.
    pub fn into_response_with_message(self, message: String) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let mut body = json!({
            "success": false,
            "error": message,
        });
        if let Some(code) = self.error_code() {
            body["code"] = json!(code);
        }

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for FhevmError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        self.into_response_with_message(message)
    }
}

impl From<reqwest::Error> for FhevmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Gateway(format!("Request timed out: {err}"))
        } else if err.is_connect() {
            Self::Gateway(format!("Connection failed: {err}"))
        } else {
            Self::Gateway(err.to_string())
        }
    }
}

impl From<redb::Error> for FhevmError {
    fn from(err: redb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::DatabaseError> for FhevmError {
    fn from(err: redb::DatabaseError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::TableError> for FhevmError {
    fn from(err: redb::TableError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::TransactionError> for FhevmError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::CommitError> for FhevmError {
    fn from(err: redb::CommitError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::StorageError> for FhevmError {
    fn from(err: redb::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
