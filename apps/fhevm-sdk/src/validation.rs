//! Input validation for encryption, decryption and addressing.
//!
//! Values arrive as loosely typed JSON (numbers, numeric strings, booleans)
//! and leave as a [`ClearValue`] in the host representation for the declared
//! [`FheType`]. Nothing reaches the FHE library without passing through here.

use num_bigint::BigUint;
use serde_json::Value;

use crate::error::FhevmError;
use crate::types::{ClearValue, FheType, Handle};

fn has_hex_body(value: &str, prefix_len: usize, digits: usize) -> bool {
    value.len() == prefix_len + digits
        && value.starts_with("0x")
        && value[prefix_len..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// `0x` followed by 40 hex characters.
pub fn is_valid_address(address: &str) -> bool {
    has_hex_body(address, 2, 40)
}

/// `0x` followed by 64 hex characters.
pub fn is_valid_handle(handle: &str) -> bool {
    has_hex_body(handle, 2, 64)
}

pub fn is_valid_tx_hash(hash: &str) -> bool {
    has_hex_body(hash, 2, 64)
}

/// Parse an unsigned integer from a JSON number or a decimal / `0x` hex
/// string. Negative or fractional inputs yield `None`.
pub fn parse_unsigned(value: &Value) -> Option<BigUint> {
    match value {
        Value::Number(number) => number.as_u64().map(BigUint::from),
        Value::String(text) => parse_unsigned_str(text),
        _ => None,
    }
}

fn parse_unsigned_str(text: &str) -> Option<BigUint> {
    let text = text.trim();
    if let Some(digits) = text.strip_prefix("0x") {
        if digits.is_empty() {
            return None;
        }
        return BigUint::parse_bytes(digits.as_bytes(), 16);
    }
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(text.as_bytes(), 10)
}

fn range_error(fhe_type: FheType, max: &BigUint) -> FhevmError {
    FhevmError::InvalidInput(format!(
        "Value must be between 0 and {max} for {fhe_type} type"
    ))
}

/// Validate `value` against `fhe_type` and normalize it into the host
/// representation used for encryption.
pub fn parse_clear_value(value: &Value, fhe_type: FheType) -> Result<ClearValue, FhevmError> {
    match fhe_type {
        FheType::Ebool => match value {
            Value::Bool(flag) => Ok(ClearValue::Bool(*flag)),
            Value::Number(number) if number.as_u64() == Some(0) => Ok(ClearValue::Bool(false)),
            Value::Number(number) if number.as_u64() == Some(1) => Ok(ClearValue::Bool(true)),
            _ => Err(FhevmError::InvalidInput(
                "Value must be boolean for ebool type".to_string(),
            )),
        },
        FheType::Euint8 | FheType::Euint16 | FheType::Euint32 => {
            let max = fhe_type
                .max_value()
                .ok_or_else(|| FhevmError::Internal(format!("{fhe_type} has no range")))?;
            let parsed = parse_unsigned(value).ok_or_else(|| range_error(fhe_type, &max))?;
            if parsed > max {
                return Err(range_error(fhe_type, &max));
            }
            let narrow = u32::try_from(&parsed).map_err(|_| range_error(fhe_type, &max))?;
            Ok(ClearValue::Number(narrow))
        }
        FheType::Euint64 | FheType::Euint128 | FheType::Euint256 => {
            let max = fhe_type
                .max_value()
                .ok_or_else(|| FhevmError::Internal(format!("{fhe_type} has no range")))?;
            let parsed = parse_unsigned(value).ok_or_else(|| {
                FhevmError::InvalidInput(format!(
                    "Value must be a non-negative number or bigint for {fhe_type} type"
                ))
            })?;
            if parsed > max {
                return Err(range_error(fhe_type, &max));
            }
            Ok(ClearValue::BigInt(parsed))
        }
        FheType::Eaddress => match value {
            Value::String(address) if is_valid_address(address) => {
                Ok(ClearValue::Address(address.clone()))
            }
            _ => Err(FhevmError::InvalidInput(
                "Value must be a valid Ethereum address for eaddress type".to_string(),
            )),
        },
    }
}

/// Check the pieces of a decryption request before any network call.
pub fn validate_decryption_request(
    handle: Option<&str>,
    fhe_type: Option<&str>,
    contract_address: Option<&str>,
) -> Result<(Handle, FheType), FhevmError> {
    let handle = handle
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FhevmError::InvalidInput("Invalid encrypted handle".to_string()))?;
    let handle: Handle = handle.parse()?;

    let fhe_type = fhe_type
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            FhevmError::InvalidInput("Data type is required for decryption".to_string())
        })?
        .parse::<FheType>()?;

    if let Some(address) = contract_address {
        if !is_valid_address(address) {
            return Err(FhevmError::InvalidInput(
                "Invalid contract address".to_string(),
            ));
        }
    }

    Ok((handle, fhe_type))
}

pub fn is_decryption_authorized(user_address: &str, required_address: &str) -> bool {
    user_address.eq_ignore_ascii_case(required_address)
}

/// Bounds-check a numeric form field.
pub fn validate_numeric_input(
    value: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<f64, FhevmError> {
    let number: f64 = value
        .trim()
        .parse()
        .ok()
        .filter(|number: &f64| number.is_finite())
        .ok_or_else(|| FhevmError::InvalidInput("Invalid number format".to_string()))?;

    if let Some(min) = min {
        if number < min {
            return Err(FhevmError::InvalidInput(format!(
                "Value must be at least {min}"
            )));
        }
    }
    if let Some(max) = max {
        if number > max {
            return Err(FhevmError::InvalidInput(format!(
                "Value must be at most {max}"
            )));
        }
    }
    Ok(number)
}
