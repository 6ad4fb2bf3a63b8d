//! Shared test utilities for FHEVM integration tests.
//!
//! # Performance Note
//!
//! TFHE key generation is expensive (~5-10 seconds). The gateway key store is
//! generated once per test binary and shared through `OnceLock`.
#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use fhevm_sdk::crypto::{derive_handle, encrypt_clear_value, KeyStore};
use fhevm_sdk::gateway::InputUpload;
use fhevm_sdk::transport::encode_msgpack_gzip;
use fhevm_sdk::types::{ClearValue, EncryptedValue, FheType};

pub const CHAIN_ID: u64 = 31337;
pub const USER: &str = "0x5986ff19b524534f159af67f421ca081c6f5acff";
pub const OTHER_USER: &str = "0x0000000000000000000000000000000000000bad";
pub const CONTRACT: &str = "0x87288e6cee215e01d2704c0d4d01eaf1d192659d";

static KEY_STORE: OnceLock<Arc<KeyStore>> = OnceLock::new();

/// Gateway keys, generated on first use.
pub fn shared_keystore() -> Arc<KeyStore> {
    KEY_STORE
        .get_or_init(|| Arc::new(KeyStore::open(None).unwrap()))
        .clone()
}

/// Encrypt `clear` under the shared public key and bind it to `chain_id`.
pub fn encrypt(clear: ClearValue, fhe_type: FheType, chain_id: u64) -> EncryptedValue {
    let keys = shared_keystore();
    let ciphertext = encrypt_clear_value(&clear, fhe_type, keys.public_key()).unwrap();
    EncryptedValue {
        handle: derive_handle(&ciphertext, fhe_type, chain_id),
        fhe_type,
        ciphertext,
    }
}

pub fn upload(encrypted: &EncryptedValue, owner: Option<&str>, chain_id: u64) -> InputUpload {
    InputUpload {
        handle: encrypted.handle.to_hex(),
        fhe_type: encrypted.fhe_type.to_string(),
        ciphertext: encrypted.ciphertext.clone(),
        user_address: owner.map(str::to_string),
        chain_id,
    }
}

/// Gzipped msgpack body for `POST /inputs`.
pub fn upload_body(upload: &InputUpload) -> Vec<u8> {
    encode_msgpack_gzip(upload).unwrap()
}
