//! Core FHEVM data types: type tags, handles, encrypted envelopes and
//! plaintext host values.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FhevmError;

/// Handle layout version written to byte 31.
pub const HANDLE_VERSION: u8 = 0;

const HANDLE_TYPE_BYTE: usize = 30;
const HANDLE_VERSION_BYTE: usize = 31;

/// Encrypted data kinds understood by FHEVM contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FheType {
    Ebool,
    Euint8,
    Euint16,
    Euint32,
    Euint64,
    Euint128,
    Euint256,
    Eaddress,
}

impl FheType {
    pub const ALL: [FheType; 8] = [
        FheType::Ebool,
        FheType::Euint8,
        FheType::Euint16,
        FheType::Euint32,
        FheType::Euint64,
        FheType::Euint128,
        FheType::Euint256,
        FheType::Eaddress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FheType::Ebool => "ebool",
            FheType::Euint8 => "euint8",
            FheType::Euint16 => "euint16",
            FheType::Euint32 => "euint32",
            FheType::Euint64 => "euint64",
            FheType::Euint128 => "euint128",
            FheType::Euint256 => "euint256",
            FheType::Eaddress => "eaddress",
        }
    }

    /// Plaintext width in bits.
    pub fn bits(self) -> u32 {
        match self {
            FheType::Ebool => 1,
            FheType::Euint8 => 8,
            FheType::Euint16 => 16,
            FheType::Euint32 => 32,
            FheType::Euint64 => 64,
            FheType::Euint128 => 128,
            FheType::Euint256 => 256,
            FheType::Eaddress => 160,
        }
    }

    /// Type code embedded in byte 30 of a handle.
    pub fn handle_code(self) -> u8 {
        match self {
            FheType::Ebool => 0,
            FheType::Euint8 => 2,
            FheType::Euint16 => 3,
            FheType::Euint32 => 4,
            FheType::Euint64 => 5,
            FheType::Euint128 => 6,
            FheType::Eaddress => 7,
            FheType::Euint256 => 8,
        }
    }

    pub fn from_handle_code(code: u8) -> Result<Self, FhevmError> {
        FheType::ALL
            .into_iter()
            .find(|ty| ty.handle_code() == code)
            .ok_or_else(|| FhevmError::UnsupportedType(format!("handle type code {code}")))
    }

    pub fn from_handle(handle: &Handle) -> Result<Self, FhevmError> {
        Self::from_handle_code(handle.type_code())
    }

    /// Types whose plaintext does not fit a JS-safe number and is surfaced
    /// as a big integer.
    pub fn is_big_integer(self) -> bool {
        matches!(
            self,
            FheType::Euint64 | FheType::Euint128 | FheType::Euint256
        )
    }

    /// Largest plaintext accepted for unsigned integer kinds.
    pub fn max_value(self) -> Option<BigUint> {
        match self {
            FheType::Ebool | FheType::Eaddress => None,
            ty => Some((BigUint::from(1u8) << ty.bits()) - 1u8),
        }
    }
}

impl fmt::Display for FheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FheType {
    type Err = FhevmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FheType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == value)
            .ok_or_else(|| FhevmError::UnsupportedType(value.to_string()))
    }
}

pub fn is_supported_type(value: &str) -> bool {
    value.parse::<FheType>().is_ok()
}

/// Opaque 32-byte reference to an encrypted value stored on chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle([u8; 32]);

impl Handle {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build a handle from a 32-byte digest, stamping the type code and
    /// layout version into the last two bytes.
    pub fn from_digest(mut digest: [u8; 32], fhe_type: FheType) -> Self {
        digest[HANDLE_TYPE_BYTE] = fhe_type.handle_code();
        digest[HANDLE_VERSION_BYTE] = HANDLE_VERSION;
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn type_code(&self) -> u8 {
        self.0[HANDLE_TYPE_BYTE]
    }

    pub fn version(&self) -> u8 {
        self.0[HANDLE_VERSION_BYTE]
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, FhevmError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            FhevmError::InvalidInput(format!(
                "invalid handle: expected 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }
}

impl FromStr for Handle {
    type Err = FhevmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value
            .strip_prefix("0x")
            .ok_or_else(|| FhevmError::InvalidInput("invalid handle: missing 0x prefix".into()))?;
        if digits.len() != 64 {
            return Err(FhevmError::InvalidInput(format!(
                "invalid handle: expected 64 hex characters, got {}",
                digits.len()
            )));
        }
        let bytes = hex::decode(digits)
            .map_err(|error| FhevmError::InvalidInput(format!("invalid handle: {error}")))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.to_hex())
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// A handle together with the type it was declared with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedHandle {
    pub data: Handle,
    #[serde(rename = "type")]
    pub fhe_type: FheType,
}

/// Result of encrypting a single input.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    pub handle: Handle,
    pub fhe_type: FheType,
    pub ciphertext: Vec<u8>,
}

impl EncryptedValue {
    /// Proof blob passed to contracts alongside the handle: one handle
    /// followed by the ciphertext it commits to.
    pub fn input_proof(&self) -> String {
        let mut proof = Vec::with_capacity(1 + 32 + self.ciphertext.len());
        proof.push(1u8);
        proof.extend_from_slice(self.handle.as_bytes());
        proof.extend_from_slice(&self.ciphertext);
        format!("0x{}", hex::encode(proof))
    }

    pub fn encrypted_handle(&self) -> EncryptedHandle {
        EncryptedHandle {
            data: self.handle,
            fhe_type: self.fhe_type,
        }
    }
}

impl fmt::Debug for EncryptedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedValue")
            .field("handle", &self.handle)
            .field("fhe_type", &self.fhe_type)
            .field("ciphertext_bytes", &self.ciphertext.len())
            .finish()
    }
}

pub fn format_encrypted_value(encrypted: &EncryptedValue) -> String {
    encrypted.handle.to_hex()
}

/// Plaintext in its host representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClearValue {
    Bool(bool),
    /// `euint8`, `euint16` and `euint32`.
    Number(u32),
    /// `euint64`, `euint128` and `euint256`.
    BigInt(BigUint),
    /// `eaddress`, `0x`-prefixed.
    Address(String),
}

impl ClearValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ClearValue::Bool(value) => serde_json::Value::Bool(*value),
            ClearValue::Number(value) => serde_json::Value::from(*value),
            ClearValue::BigInt(value) => serde_json::Value::String(value.to_string()),
            ClearValue::Address(value) => serde_json::Value::String(value.clone()),
        }
    }
}

impl Serialize for ClearValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClearValue::Bool(value) => serializer.serialize_bool(*value),
            ClearValue::Number(value) => serializer.serialize_u32(*value),
            ClearValue::BigInt(value) => serializer.collect_str(value),
            ClearValue::Address(value) => serializer.serialize_str(value),
        }
    }
}

impl fmt::Display for ClearValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearValue::Bool(value) => write!(f, "{value}"),
            ClearValue::Number(value) => write!(f, "{value}"),
            ClearValue::BigInt(value) => write!(f, "{value}"),
            ClearValue::Address(value) => f.write_str(value),
        }
    }
}

/// Supported network presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Sepolia,
    Mainnet,
    Localhost,
    Zama,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Sepolia => "sepolia",
            Network::Mainnet => "mainnet",
            Network::Localhost => "localhost",
            Network::Zama => "zama",
        }
    }
}

impl FromStr for Network {
    type Err = FhevmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sepolia" => Ok(Network::Sepolia),
            "mainnet" => Ok(Network::Mainnet),
            "localhost" => Ok(Network::Localhost),
            "zama" => Ok(Network::Zama),
            other => Err(FhevmError::InvalidInput(format!("Unknown network: {other}"))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub chain_id: u64,
    pub name: String,
}

/// Overrides for state-changing contract calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractCallOptions {
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub value: Option<u128>,
    pub nonce: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub hash: String,
    pub block_number: u64,
    pub status: u64,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}
