//! EIP-712 typed data for decryption authorization.
//!
//! Builders return the structure a wallet signs together with the digest it
//! signs over: `keccak256(0x1901 ‖ domainSeparator ‖ hashStruct(message))`.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::FhevmError;
use crate::keccak::keccak256;
use crate::types::Handle;
use crate::validation::is_valid_address;

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const DECRYPT_TYPE: &str = "Decrypt(address account,bytes32 handle)";
const DECRYPTION_REQUEST_TYPE: &str = "DecryptionRequest(bytes32 handle,address user)";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: String,
}

/// Typed data ready for `eth_signTypedData_v4`, plus its digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub domain: Eip712Domain,
    pub types: Value,
    pub primary_type: String,
    pub message: Value,
    #[serde(skip)]
    pub digest: [u8; 32],
}

impl TypedData {
    pub fn digest_hex(&self) -> String {
        format!("0x{}", hex::encode(self.digest))
    }
}

fn address_word(address: &str) -> Result<[u8; 32], FhevmError> {
    if !is_valid_address(address) {
        return Err(FhevmError::InvalidInput(format!("Invalid address: {address}")));
    }
    let bytes = hex::decode(&address[2..])
        .map_err(|error| FhevmError::InvalidInput(format!("Invalid address {address}: {error}")))?;
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn hash_struct(type_string: &str, fields: &[[u8; 32]]) -> [u8; 32] {
    let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
    encoded.extend_from_slice(&keccak256(type_string.as_bytes()));
    for field in fields {
        encoded.extend_from_slice(field);
    }
    keccak256(&encoded)
}

impl Eip712Domain {
    pub fn separator(&self) -> Result<[u8; 32], FhevmError> {
        Ok(hash_struct(
            DOMAIN_TYPE,
            &[
                keccak256(self.name.as_bytes()),
                keccak256(self.version.as_bytes()),
                uint_word(self.chain_id),
                address_word(&self.verifying_contract)?,
            ],
        ))
    }

    fn types_json() -> Value {
        json!([
            { "name": "name", "type": "string" },
            { "name": "version", "type": "string" },
            { "name": "chainId", "type": "uint256" },
            { "name": "verifyingContract", "type": "address" }
        ])
    }
}

fn signing_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(domain_separator);
    preimage.extend_from_slice(struct_hash);
    keccak256(&preimage)
}

/// `Decrypt(address account, bytes32 handle)` under the `FHEVM`/`1` domain.
pub fn decrypt_authorization(
    user: &str,
    contract: &str,
    handle: &Handle,
    chain_id: u64,
) -> Result<TypedData, FhevmError> {
    let domain = Eip712Domain {
        name: "FHEVM".to_string(),
        version: "1".to_string(),
        chain_id,
        verifying_contract: contract.to_string(),
    };
    let struct_hash = hash_struct(DECRYPT_TYPE, &[address_word(user)?, *handle.as_bytes()]);
    let digest = signing_digest(&domain.separator()?, &struct_hash);

    Ok(TypedData {
        domain,
        types: json!({
            "EIP712Domain": Eip712Domain::types_json(),
            "Decrypt": [
                { "name": "account", "type": "address" },
                { "name": "handle", "type": "bytes32" }
            ]
        }),
        primary_type: "Decrypt".to_string(),
        message: json!({ "account": user, "handle": handle.to_hex() }),
        digest,
    })
}

/// `DecryptionRequest(bytes32 handle, address user)` under the
/// `FHEVM Decryption`/`1` domain.
pub fn decryption_request(
    handle: &Handle,
    contract: &str,
    user: &str,
    chain_id: u64,
) -> Result<TypedData, FhevmError> {
    let domain = Eip712Domain {
        name: "FHEVM Decryption".to_string(),
        version: "1".to_string(),
        chain_id,
        verifying_contract: contract.to_string(),
    };
    let struct_hash = hash_struct(
        DECRYPTION_REQUEST_TYPE,
        &[*handle.as_bytes(), address_word(user)?],
    );
    let digest = signing_digest(&domain.separator()?, &struct_hash);

    Ok(TypedData {
        domain,
        types: json!({
            "EIP712Domain": Eip712Domain::types_json(),
            "DecryptionRequest": [
                { "name": "handle", "type": "bytes32" },
                { "name": "user", "type": "address" }
            ]
        }),
        primary_type: "DecryptionRequest".to_string(),
        message: json!({ "handle": handle.to_hex(), "user": user }),
        digest,
    })
}
