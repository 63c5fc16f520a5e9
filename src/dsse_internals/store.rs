use super::{error::DsseError, params::STORE_FILE_NAME};
use parking_lot::RwLock;
use redb::{Database, TableDefinition};
use std::{collections::HashMap, path::Path};
use tracing::info;

const CHAIN_LINKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("chain_links");

/// Opaque byte-string key-value map holding the encrypted chain links.
///
/// Point writes and point reads are all the chain index needs; a key that was never written must read back as `None`.
pub trait IndexBackend: Send + Sync {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DsseError>;

    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<(), DsseError> {
        entries.iter().try_for_each(|(key, value)| self.put(key, value))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DsseError>;
}

/// Persistent backend, one `redb` database file inside the store directory.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    pub fn open(dir: &Path) -> Result<RedbBackend, DsseError> {
        std::fs::create_dir_all(dir).map_err(|err| DsseError::StorageOpen(format!("{}: {}", dir.display(), err)))?;

        let file = dir.join(STORE_FILE_NAME);
        let db = Database::create(&file).map_err(|err| DsseError::StorageOpen(format!("{}: {}", file.display(), err)))?;

        // Reads open the table without creating it, so it must exist before the first search.
        let txn = db.begin_write().map_err(|err| DsseError::StorageOpen(err.to_string()))?;
        txn.open_table(CHAIN_LINKS).map_err(|err| DsseError::StorageOpen(err.to_string()))?;
        txn.commit().map_err(|err| DsseError::StorageOpen(err.to_string()))?;

        info!(path = %file.display(), "Opened chain index store");
        Ok(RedbBackend { db })
    }
}

impl IndexBackend for RedbBackend {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DsseError> {
        self.put_batch(&[(key, value)])
    }

    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<(), DsseError> {
        let txn = self.db.begin_write().map_err(|err| DsseError::StorageWrite(err.to_string()))?;
        {
            let mut table = txn.open_table(CHAIN_LINKS).map_err(|err| DsseError::StorageWrite(err.to_string()))?;
            for &(key, value) in entries {
                table.insert(key, value).map_err(|err| DsseError::StorageWrite(err.to_string()))?;
            }
        }
        txn.commit().map_err(|err| DsseError::StorageWrite(err.to_string()))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DsseError> {
        let txn = self.db.begin_read().map_err(|err| DsseError::StorageRead(err.to_string()))?;
        let table = txn.open_table(CHAIN_LINKS).map_err(|err| DsseError::StorageRead(err.to_string()))?;

        let value = table.get(key).map_err(|err| DsseError::StorageRead(err.to_string()))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }
}

/// In-process backend, for tests and benchmarks which don't need persistence.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn remove(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.write().remove(key)
    }
}

impl IndexBackend for MemoryBackend {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DsseError> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn put_batch(&self, entries: &[(&[u8], &[u8])]) -> Result<(), DsseError> {
        let mut map = self.entries.write();
        entries.iter().for_each(|&(key, value)| {
            map.insert(key.to_vec(), value.to_vec());
        });
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DsseError> {
        Ok(self.entries.read().get(key).cloned())
    }
}
