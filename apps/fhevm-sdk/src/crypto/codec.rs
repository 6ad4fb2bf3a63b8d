use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::FhevmError;

pub fn encode_tfhe_binary<T: Serialize>(value: &T) -> Result<Vec<u8>, FhevmError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode_tfhe_binary<T: DeserializeOwned>(value: &[u8]) -> Result<T, FhevmError> {
    Ok(bincode::deserialize(value)?)
}

pub fn encode_bincode_base64<T: Serialize>(value: &T) -> Result<String, FhevmError> {
    Ok(BASE64.encode(encode_tfhe_binary(value)?))
}

pub fn decode_bincode_base64<T: DeserializeOwned>(value: &str) -> Result<T, FhevmError> {
    let bytes = BASE64.decode(value.trim())?;
    decode_tfhe_binary(&bytes)
}
