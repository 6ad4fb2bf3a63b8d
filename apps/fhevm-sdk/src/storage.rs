//! ReDB storage for ciphertexts submitted to the development gateway.
//!
//! Keys are handle hex strings; values are bincode-encoded [`StoredInput`]s.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::{FhevmError, FhevmResult};
use crate::types::{FheType, Handle};

const CIPHERTEXTS: TableDefinition<&str, &[u8]> = TableDefinition::new("ciphertexts");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredInput {
    pub fhe_type: FheType,
    #[serde(with = "serde_bytes")]
    pub ciphertext: Vec<u8>,
    /// Address allowed to decrypt; `None` means anyone.
    pub owner: Option<String>,
    pub chain_id: u64,
    pub stored_at: i64,
}

/// Thread-safe via internal Arc. Clone is cheap.
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl Storage {
    /// Open or create a database at `path`, creating parent directories.
    pub fn open(path: &Path) -> FhevmResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;
        Self::init(db).inspect(|_| {
            tracing::info!(path = %path.display(), "Opened ciphertext database");
        })
    }

    pub fn open_memory() -> FhevmResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| FhevmError::Storage(e.to_string()))?;
        Self::init(db)
    }

    fn init(db: Database) -> FhevmResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CIPHERTEXTS)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn put_input(&self, handle: &Handle, input: &StoredInput) -> FhevmResult<()> {
        let key = handle.to_hex();
        let value = bincode::serialize(input)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CIPHERTEXTS)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;
        tracing::debug!(handle = %key, bytes = input.ciphertext.len(), "Stored ciphertext");
        Ok(())
    }

    pub fn get_input(&self, handle: &Handle) -> FhevmResult<Option<StoredInput>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CIPHERTEXTS)?;

        match table.get(handle.to_hex().as_str())? {
            Some(value) => Ok(Some(bincode::deserialize(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn delete_input(&self, handle: &Handle) -> FhevmResult<bool> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(CIPHERTEXTS)?;
            let removed = table.remove(handle.to_hex().as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    pub fn input_count(&self) -> FhevmResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CIPHERTEXTS)?;
        Ok(table.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoredInput {
        StoredInput {
            fhe_type: FheType::Euint16,
            ciphertext: vec![1, 2, 3, 4],
            owner: Some("0x5986ff19b524534f159af67f421ca081c6f5acff".into()),
            chain_id: 31337,
            stored_at: 1_700_000_000,
        }
    }

    #[test]
    fn put_get_delete() {
        let storage = Storage::open_memory().unwrap();
        let handle = Handle::from_digest([3u8; 32], FheType::Euint16);

        assert!(storage.get_input(&handle).unwrap().is_none());
        storage.put_input(&handle, &sample()).unwrap();
        assert_eq!(storage.get_input(&handle).unwrap(), Some(sample()));
        assert_eq!(storage.input_count().unwrap(), 1);

        assert!(storage.delete_input(&handle).unwrap());
        assert!(!storage.delete_input(&handle).unwrap());
        assert_eq!(storage.input_count().unwrap(), 0);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.redb");
        let handle = Handle::from_digest([9u8; 32], FheType::Euint16);
        {
            let storage = Storage::open(&path).unwrap();
            storage.put_input(&handle, &sample()).unwrap();
        }
        let reopened = Storage::open(&path).unwrap();
        assert_eq!(reopened.get_input(&handle).unwrap(), Some(sample()));
    }
}
