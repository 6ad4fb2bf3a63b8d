//! Disk persistence of gateway keys and registered ciphertexts.

mod common;

use std::fs;

use fhevm_sdk::crypto::{decrypt_ciphertext, KeyStore};
use fhevm_sdk::storage::{Storage, StoredInput};
use fhevm_sdk::types::{ClearValue, FheType};
use tempfile::TempDir;

/// Keys generated into an empty directory are written to disk and reloaded
/// unchanged.
#[test]
fn keystore_persists_and_reloads() {
    let temp_dir = TempDir::new().unwrap();
    let keys_dir = temp_dir.path().join("keys");

    let original = KeyStore::open(Some(keys_dir.clone())).expect("Failed to generate keys");

    let keystore_path = KeyStore::keystore_path(&keys_dir);
    assert!(
        keystore_path.exists(),
        "Keystore file should be created at {}",
        keystore_path.display()
    );
    assert!(fs::metadata(&keystore_path).unwrap().len() > 0);
    assert!(!keys_dir.join("keystore.bincode.tmp").exists());

    let reloaded = KeyStore::open(Some(keys_dir)).expect("Failed to reload keys");
    assert_eq!(reloaded.public_key_b64(), original.public_key_b64());
}

/// A corrupt keystore file is left alone and reported, never overwritten with
/// new keys.
#[test]
fn corrupt_keystore_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let keys_dir = temp_dir.path().to_path_buf();
    let keystore_path = KeyStore::keystore_path(&keys_dir);
    fs::write(&keystore_path, b"garbage").unwrap();

    let err = match KeyStore::open(Some(keys_dir)) {
        Ok(_) => panic!("corrupt keystore should not load"),
        Err(err) => err,
    };

    assert!(err.to_string().contains("unreadable"), "{err}");
    assert_eq!(fs::read(&keystore_path).unwrap(), b"garbage");
}

/// Ciphertexts stored by the gateway survive a restart and still decrypt.
#[test]
fn stored_ciphertext_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("data").join("gateway.redb");
    let encrypted = common::encrypt(ClearValue::Number(512), FheType::Euint16, common::CHAIN_ID);

    {
        let storage = Storage::open(&db_path).unwrap();
        storage
            .put_input(
                &encrypted.handle,
                &StoredInput {
                    fhe_type: FheType::Euint16,
                    ciphertext: encrypted.ciphertext.clone(),
                    owner: Some(common::USER.to_string()),
                    chain_id: common::CHAIN_ID,
                    stored_at: 0,
                },
            )
            .unwrap();
    }

    let storage = Storage::open(&db_path).unwrap();
    let stored = storage.get_input(&encrypted.handle).unwrap().unwrap();
    assert_eq!(stored.owner.as_deref(), Some(common::USER));

    let keys = common::shared_keystore();
    let clear = decrypt_ciphertext(&stored.ciphertext, stored.fhe_type, keys.client_key()).unwrap();
    assert_eq!(clear, ClearValue::Number(512));
}
