//! Typed encrypt/decrypt dispatch over the TFHE high-level API.
//!
//! Each [`FheType`] maps onto one TFHE ciphertext type:
//! `ebool` → `FheBool`, `euintN` → `FheUintN`, `eaddress` → `FheUint160`.
//! Ciphertexts travel as bincode bytes.

use num_bigint::BigUint;
use tfhe::integer::U256;
use tfhe::prelude::*;
use tfhe::{
    ClientKey, CompressedPublicKey, FheBool, FheUint128, FheUint16, FheUint160, FheUint256,
    FheUint32, FheUint64, FheUint8,
};

use super::{decode_tfhe_binary, encode_tfhe_binary};
use crate::decryption::address_from_uint;
use crate::error::FhevmError;
use crate::keccak::keccak256;
use crate::types::{ClearValue, FheType, Handle};

fn tfhe_error(error: impl std::fmt::Display) -> FhevmError {
    FhevmError::Tfhe(error.to_string())
}

fn mismatch(value: &ClearValue, fhe_type: FheType) -> FhevmError {
    FhevmError::InvalidInput(format!("Value {value} cannot be encrypted as {fhe_type}"))
}

pub fn biguint_to_u256(value: &BigUint) -> Result<U256, FhevmError> {
    let digits = value.to_u64_digits();
    if digits.len() > 4 {
        return Err(FhevmError::InvalidInput(format!(
            "Value {value} does not fit in 256 bits"
        )));
    }
    let word = |index: usize| u128::from(digits.get(index).copied().unwrap_or(0));
    let low = word(0) | (word(1) << 64);
    let high = word(2) | (word(3) << 64);
    Ok(U256::from((low, high)))
}

pub fn u256_to_biguint(value: U256) -> BigUint {
    let (low, high) = value.to_low_high_u128();
    (BigUint::from(high) << 128u32) | BigUint::from(low)
}

fn address_to_u256(address: &str) -> Result<U256, FhevmError> {
    let digits = address
        .strip_prefix("0x")
        .ok_or_else(|| FhevmError::InvalidInput(format!("Invalid address: {address}")))?;
    let parsed = BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| FhevmError::InvalidInput(format!("Invalid address: {address}")))?;
    biguint_to_u256(&parsed)
}

fn narrow<T: TryFrom<u32>>(value: u32, clear: &ClearValue, fhe_type: FheType) -> Result<T, FhevmError> {
    T::try_from(value).map_err(|_| mismatch(clear, fhe_type))
}

fn wide<'a, T: TryFrom<&'a BigUint>>(
    value: &'a BigUint,
    clear: &ClearValue,
    fhe_type: FheType,
) -> Result<T, FhevmError> {
    T::try_from(value).map_err(|_| mismatch(clear, fhe_type))
}

/// Encrypt a validated plaintext under the network public key.
pub fn encrypt_clear_value(
    value: &ClearValue,
    fhe_type: FheType,
    public_key: &CompressedPublicKey,
) -> Result<Vec<u8>, FhevmError> {
    match (fhe_type, value) {
        (FheType::Ebool, ClearValue::Bool(flag)) => {
            let encrypted = FheBool::try_encrypt(*flag, public_key).map_err(tfhe_error)?;
            encode_tfhe_binary(&encrypted)
        }
        (FheType::Euint8, ClearValue::Number(number)) => {
            let clear: u8 = narrow(*number, value, fhe_type)?;
            let encrypted = FheUint8::try_encrypt(clear, public_key).map_err(tfhe_error)?;
            encode_tfhe_binary(&encrypted)
        }
        (FheType::Euint16, ClearValue::Number(number)) => {
            let clear: u16 = narrow(*number, value, fhe_type)?;
            let encrypted = FheUint16::try_encrypt(clear, public_key).map_err(tfhe_error)?;
            encode_tfhe_binary(&encrypted)
        }
        (FheType::Euint32, ClearValue::Number(number)) => {
            let encrypted = FheUint32::try_encrypt(*number, public_key).map_err(tfhe_error)?;
            encode_tfhe_binary(&encrypted)
        }
        (FheType::Euint64, ClearValue::BigInt(number)) => {
            let clear: u64 = wide(number, value, fhe_type)?;
            let encrypted = FheUint64::try_encrypt(clear, public_key).map_err(tfhe_error)?;
            encode_tfhe_binary(&encrypted)
        }
        (FheType::Euint128, ClearValue::BigInt(number)) => {
            let clear: u128 = wide(number, value, fhe_type)?;
            let encrypted = FheUint128::try_encrypt(clear, public_key).map_err(tfhe_error)?;
            encode_tfhe_binary(&encrypted)
        }
        (FheType::Euint256, ClearValue::BigInt(number)) => {
            let clear = biguint_to_u256(number)?;
            let encrypted = FheUint256::try_encrypt(clear, public_key).map_err(tfhe_error)?;
            encode_tfhe_binary(&encrypted)
        }
        (FheType::Eaddress, ClearValue::Address(address)) => {
            let clear = address_to_u256(address)?;
            let encrypted = FheUint160::try_encrypt(clear, public_key).map_err(tfhe_error)?;
            encode_tfhe_binary(&encrypted)
        }
        _ => Err(mismatch(value, fhe_type)),
    }
}

/// Decrypt a bincode ciphertext of the declared type with the client key.
pub fn decrypt_ciphertext(
    ciphertext: &[u8],
    fhe_type: FheType,
    client_key: &ClientKey,
) -> Result<ClearValue, FhevmError> {
    let clear = match fhe_type {
        FheType::Ebool => {
            let encrypted: FheBool = decode_tfhe_binary(ciphertext)?;
            let flag: bool = encrypted.decrypt(client_key);
            ClearValue::Bool(flag)
        }
        FheType::Euint8 => {
            let encrypted: FheUint8 = decode_tfhe_binary(ciphertext)?;
            let number: u8 = encrypted.decrypt(client_key);
            ClearValue::Number(number.into())
        }
        FheType::Euint16 => {
            let encrypted: FheUint16 = decode_tfhe_binary(ciphertext)?;
            let number: u16 = encrypted.decrypt(client_key);
            ClearValue::Number(number.into())
        }
        FheType::Euint32 => {
            let encrypted: FheUint32 = decode_tfhe_binary(ciphertext)?;
            let number: u32 = encrypted.decrypt(client_key);
            ClearValue::Number(number)
        }
        FheType::Euint64 => {
            let encrypted: FheUint64 = decode_tfhe_binary(ciphertext)?;
            let number: u64 = encrypted.decrypt(client_key);
            ClearValue::BigInt(BigUint::from(number))
        }
        FheType::Euint128 => {
            let encrypted: FheUint128 = decode_tfhe_binary(ciphertext)?;
            let number: u128 = encrypted.decrypt(client_key);
            ClearValue::BigInt(BigUint::from(number))
        }
        FheType::Euint256 => {
            let encrypted: FheUint256 = decode_tfhe_binary(ciphertext)?;
            let number: U256 = encrypted.decrypt(client_key);
            ClearValue::BigInt(u256_to_biguint(number))
        }
        FheType::Eaddress => {
            let encrypted: FheUint160 = decode_tfhe_binary(ciphertext)?;
            let number: U256 = encrypted.decrypt(client_key);
            address_from_uint(&u256_to_biguint(number)).ok_or_else(|| {
                FhevmError::Internal("decrypted address wider than 160 bits".to_string())
            })?
        }
    };
    Ok(clear)
}

/// Handle for a ciphertext bound to a chain: keccak256(ciphertext ‖ chain id)
/// with the type code and version stamped into the last two bytes.
pub fn derive_handle(ciphertext: &[u8], fhe_type: FheType, chain_id: u64) -> Handle {
    let mut preimage = Vec::with_capacity(ciphertext.len() + 8);
    preimage.extend_from_slice(ciphertext);
    preimage.extend_from_slice(&chain_id.to_be_bytes());
    Handle::from_digest(keccak256(&preimage), fhe_type)
}

/// Check that `handle` was derived from `ciphertext` on `chain_id`.
pub fn verify_handle(
    handle: &Handle,
    ciphertext: &[u8],
    fhe_type: FheType,
    chain_id: u64,
) -> Result<(), FhevmError> {
    if derive_handle(ciphertext, fhe_type, chain_id) != *handle {
        return Err(FhevmError::InvalidInput(format!(
            "invalid handle: {handle} does not commit to the submitted {fhe_type} ciphertext"
        )));
    }
    Ok(())
}
