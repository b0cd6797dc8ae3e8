//! Guild Lottery Storage Layer - Durable Key/Snapshot Persistence
//!
//! Every piece of engine state is a whole-value snapshot under a string key:
//! - `ledger` - the full transaction ledger
//! - `current-interval` - the interval pointer and displayed message ref
//! - `draw-log/<interval>` - one immutable draw result per interval
//!
//! Snapshots are JSON. A `save` either replaces the previous snapshot
//! completely or leaves it untouched.

pub mod file;
pub mod memory;
pub mod sled_store;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sled_store::SledStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("State directory {0} is in use by another process")]
    Locked(PathBuf),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Well-known snapshot keys
pub mod keys {
    use super::Display;

    pub const LEDGER: &str = "ledger";
    pub const CURRENT_INTERVAL: &str = "current-interval";
    pub const DRAW_LOG_PREFIX: &str = "draw-log/";

    pub fn draw_log(interval: impl Display) -> String {
        format!("{}{}", DRAW_LOG_PREFIX, interval)
    }
}

/// Durable, crash-safe snapshot persistence
pub trait StateStore: Send + Sync {
    /// Raw snapshot bytes, `None` if the key was never saved
    fn load_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically replace the snapshot stored under `key`
    fn save_raw(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Keys starting with `prefix`, sorted
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.load_raw(key)?.is_some())
    }
}

/// Typed snapshot access on top of [`StateStore`]
pub trait StoreExt: StateStore {
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.load_raw(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::SerializationError(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| StorageError::SerializationError(format!("{}: {}", key, e)))?;
        self.save_raw(key, &bytes)
    }
}

impl<S: StateStore + ?Sized> StoreExt for S {}

/// Keys are `/`-separated segments of `[A-Za-z0-9._-]`, never `.` or `..`
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        });

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
