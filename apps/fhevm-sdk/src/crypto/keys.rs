//! FHE Key Management
//!
//! The decryption gateway owns the network client key. Encryption only ever
//! needs the compressed public key, which is handed out to SDK clients.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tfhe::{generate_keys, ClientKey, CompressedPublicKey, ConfigBuilder};
use tracing::{info, warn};

use super::{decode_bincode_base64, encode_bincode_base64};
use crate::error::FhevmError;

const KEYSTORE_FILE_NAME: &str = "keystore.bincode";

#[derive(Serialize, Deserialize)]
struct PersistedKeyStore {
    client_key: ClientKey,
    public_key: CompressedPublicKey,
}

/// Gateway key material.
///
/// `keys_dir`: if Some, keys are loaded from and persisted atomically to disk.
pub struct KeyStore {
    client_key: ClientKey,
    public_key: CompressedPublicKey,
    public_key_b64: String,
    keys_dir: Option<PathBuf>,
}

pub fn decode_compressed_public_key(public_key_b64: &str) -> Result<CompressedPublicKey, FhevmError> {
    decode_bincode_base64(public_key_b64)
}

pub fn encode_compressed_public_key(public_key: &CompressedPublicKey) -> Result<String, FhevmError> {
    encode_bincode_base64(public_key)
}

/// Truncate a long base64 key for logs and UIs.
pub fn format_public_key(public_key: &str, length: usize) -> String {
    if public_key.len() <= length * 2 || !public_key.is_ascii() {
        return public_key.to_string();
    }
    format!(
        "{}...{}",
        &public_key[..length],
        &public_key[public_key.len() - length..]
    )
}

impl KeyStore {
    pub fn keystore_path(keys_dir: &Path) -> PathBuf {
        keys_dir.join(KEYSTORE_FILE_NAME)
    }

    /// `Ok(None)` only when no keystore file exists. An unreadable file is an
    /// error: ciphertexts already stored by the gateway are bound to its
    /// client key, so regenerating would leave them undecryptable.
    fn load_from_disk(keys_dir: &Path) -> Result<Option<PersistedKeyStore>, FhevmError> {
        let path = Self::keystore_path(keys_dir);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        bincode::deserialize(&bytes).map(Some).map_err(|error| {
            FhevmError::Internal(format!(
                "keystore at {} is unreadable ({error}); restore it or remove it to generate new keys",
                path.display()
            ))
        })
    }

    fn persist_to_disk(&self) -> Result<(), FhevmError> {
        let Some(keys_dir) = self.keys_dir.as_ref() else {
            return Ok(());
        };
        std::fs::create_dir_all(keys_dir)?;

        let payload = PersistedKeyStore {
            client_key: self.client_key.clone(),
            public_key: self.public_key.clone(),
        };
        let bytes = bincode::serialize(&payload)?;

        let path = Self::keystore_path(keys_dir);
        let tmp_path = keys_dir.join(format!("{KEYSTORE_FILE_NAME}.tmp"));
        std::fs::write(&tmp_path, &bytes)?;
        if let Err(error) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(error.into());
        }
        Ok(())
    }

    /// Load keys from `keys_dir`, or generate and persist a fresh set when none
    /// exist yet.
    pub fn open(keys_dir: Option<PathBuf>) -> Result<Self, FhevmError> {
        if let Some(dir) = keys_dir.as_ref() {
            if let Some(persisted) = Self::load_from_disk(dir)? {
                info!("Loaded TFHE keys from disk: {}", dir.display());
                return Self::assemble(persisted.client_key, persisted.public_key, keys_dir);
            }
            warn!(
                "No persisted TFHE keys found at {}; generating new keys",
                Self::keystore_path(dir).display()
            );
        }

        info!("Generating TFHE keys (this may take a while)...");
        let config = ConfigBuilder::default().build();
        let (client_key, _server_key) = generate_keys(config);
        let public_key = CompressedPublicKey::new(&client_key);

        let store = Self::assemble(client_key, public_key, keys_dir)?;
        store.persist_to_disk()?;
        Ok(store)
    }

    /// Wrap an existing client key without touching the filesystem.
    pub fn from_client_key(client_key: ClientKey) -> Result<Self, FhevmError> {
        let public_key = CompressedPublicKey::new(&client_key);
        Self::assemble(client_key, public_key, None)
    }

    fn assemble(
        client_key: ClientKey,
        public_key: CompressedPublicKey,
        keys_dir: Option<PathBuf>,
    ) -> Result<Self, FhevmError> {
        let public_key_b64 = encode_compressed_public_key(&public_key)?;
        Ok(Self {
            client_key,
            public_key,
            public_key_b64,
            keys_dir,
        })
    }

    pub fn client_key(&self) -> &ClientKey {
        &self.client_key
    }

    pub fn public_key(&self) -> &CompressedPublicKey {
        &self.public_key
    }

    /// Base64 bincode encoding served from `GET /publicKey`.
    pub fn public_key_b64(&self) -> &str {
        &self.public_key_b64
    }
}
