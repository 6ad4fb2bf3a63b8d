//! Decryption result parsing and user-facing error messages.

use num_bigint::BigUint;
use serde_json::Value;

use crate::error::FhevmError;
use crate::types::{ClearValue, EncryptedHandle, FheType};
use crate::validation::{is_valid_address, parse_unsigned};

fn mismatch(fhe_type: FheType, value: &Value) -> FhevmError {
    FhevmError::Gateway(format!(
        "unexpected decryption result for {fhe_type}: {value}"
    ))
}

/// Map a gateway result onto the host representation for `fhe_type`.
pub fn parse_decryption_result(value: &Value, fhe_type: FheType) -> Result<ClearValue, FhevmError> {
    match fhe_type {
        FheType::Ebool => {
            let flag = match value {
                Value::Bool(flag) => Some(*flag),
                Value::Number(number) => number.as_u64().filter(|bit| *bit <= 1).map(|bit| bit == 1),
                Value::String(text) => match text.trim() {
                    "true" | "1" => Some(true),
                    "false" | "0" => Some(false),
                    _ => None,
                },
                _ => None,
            };
            flag.map(ClearValue::Bool)
                .ok_or_else(|| mismatch(fhe_type, value))
        }
        FheType::Euint8 | FheType::Euint16 | FheType::Euint32 => {
            let parsed = checked_unsigned(value, fhe_type)?;
            let narrow = u32::try_from(&parsed).map_err(|_| mismatch(fhe_type, value))?;
            Ok(ClearValue::Number(narrow))
        }
        FheType::Euint64 | FheType::Euint128 | FheType::Euint256 => {
            Ok(ClearValue::BigInt(checked_unsigned(value, fhe_type)?))
        }
        FheType::Eaddress => match value {
            Value::String(address) if is_valid_address(address) => {
                Ok(ClearValue::Address(address.clone()))
            }
            other => {
                let numeric = parse_unsigned(other).ok_or_else(|| mismatch(fhe_type, other))?;
                address_from_uint(&numeric).ok_or_else(|| mismatch(fhe_type, other))
            }
        },
    }
}

fn checked_unsigned(value: &Value, fhe_type: FheType) -> Result<BigUint, FhevmError> {
    let parsed = parse_unsigned(value).ok_or_else(|| mismatch(fhe_type, value))?;
    match fhe_type.max_value() {
        Some(max) if parsed > max => Err(mismatch(fhe_type, value)),
        _ => Ok(parsed),
    }
}

/// Render a 160-bit integer as a `0x` address.
pub fn address_from_uint(value: &BigUint) -> Option<ClearValue> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 20 {
        return None;
    }
    let mut padded = [0u8; 20];
    padded[20 - bytes.len()..].copy_from_slice(&bytes);
    Some(ClearValue::Address(format!("0x{}", hex::encode(padded))))
}

pub fn format_handle_for_gateway(handle: &EncryptedHandle) -> String {
    handle.data.to_hex()
}

/// Message suitable for showing to an end user.
pub fn decryption_error_message(error: &FhevmError) -> String {
    let text = error.to_string();
    let lowered = text.to_ascii_lowercase();
    if matches!(error, FhevmError::Unauthorized(_)) || lowered.contains("unauthorized") {
        return "User is not authorized to decrypt this value".to_string();
    }
    if lowered.contains("invalid handle") {
        return "Invalid encrypted handle provided".to_string();
    }
    if matches!(error, FhevmError::Gateway(_)) || lowered.contains("gateway") {
        return "Gateway decryption service is unavailable".to_string();
    }
    if text.is_empty() {
        "Decryption failed".to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booleans() {
        assert_eq!(
            parse_decryption_result(&json!(true), FheType::Ebool).unwrap(),
            ClearValue::Bool(true)
        );
        assert_eq!(
            parse_decryption_result(&json!(0), FheType::Ebool).unwrap(),
            ClearValue::Bool(false)
        );
        assert_eq!(
            parse_decryption_result(&json!("1"), FheType::Ebool).unwrap(),
            ClearValue::Bool(true)
        );
        assert!(parse_decryption_result(&json!(7), FheType::Ebool).is_err());
    }

    #[test]
    fn small_integers_become_numbers() {
        assert_eq!(
            parse_decryption_result(&json!(200), FheType::Euint8).unwrap(),
            ClearValue::Number(200)
        );
        assert_eq!(
            parse_decryption_result(&json!("65535"), FheType::Euint16).unwrap(),
            ClearValue::Number(65_535)
        );
        assert!(parse_decryption_result(&json!(300), FheType::Euint8).is_err());
    }

    #[test]
    fn wide_integers_become_big_ints() {
        let parsed = parse_decryption_result(&json!(u128::MAX.to_string()), FheType::Euint128)
            .unwrap();
        assert_eq!(parsed, ClearValue::BigInt(BigUint::from(u128::MAX)));

        let parsed = parse_decryption_result(&json!(5), FheType::Euint64).unwrap();
        assert_eq!(parsed, ClearValue::BigInt(BigUint::from(5u8)));
    }

    #[test]
    fn addresses_accept_strings_and_integers() {
        let address = "0x5986ff19b524534f159af67f421ca081c6f5acff";
        assert_eq!(
            parse_decryption_result(&json!(address), FheType::Eaddress).unwrap(),
            ClearValue::Address(address.to_string())
        );
        assert_eq!(
            parse_decryption_result(&json!(1), FheType::Eaddress).unwrap(),
            ClearValue::Address(format!("0x{}01", "00".repeat(19)))
        );
    }

    #[test]
    fn user_facing_messages() {
        assert_eq!(
            decryption_error_message(&FhevmError::Unauthorized("nope".into())),
            "User is not authorized to decrypt this value"
        );
        assert_eq!(
            decryption_error_message(&FhevmError::InvalidInput("invalid handle: bad".into())),
            "Invalid encrypted handle provided"
        );
        assert_eq!(
            decryption_error_message(&FhevmError::Gateway("connect refused".into())),
            "Gateway decryption service is unavailable"
        );
        assert_eq!(
            decryption_error_message(&FhevmError::InvalidInput("other".into())),
            "other"
        );
    }
}
