//! Sled-backed snapshot storage

use std::path::Path;

use tracing::debug;

use crate::{validate_key, Result, StateStore, StorageError};

/// Embedded transactional store; a single process holds the database lock
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    path: String,
}

impl SledStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = sled::open(&path)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to open database: {}", e)))?;

        Ok(SledStore { db, path: path_str })
    }

    /// Get the database path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl StateStore for SledStore {
    fn load_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        match self.db.get(key.as_bytes()) {
            Ok(Some(data)) => Ok(Some(data.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::DatabaseError(format!(
                "Failed to load {}: {}",
                key, e
            ))),
        }
    }

    fn save_raw(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to save {}: {}", key, e)))?;

        // Flush to disk so the snapshot survives a crash
        self.db
            .flush()
            .map_err(|e| StorageError::DatabaseError(format!("Failed to flush {}: {}", key, e)))?;

        debug!(key, bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item
                .map_err(|e| StorageError::DatabaseError(format!("Failed to scan keys: {}", e)))?;
            keys.push(String::from_utf8_lossy(&key).to_string());
        }
        Ok(keys)
    }
}
