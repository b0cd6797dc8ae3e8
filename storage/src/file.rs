//! Plain JSON files in a data directory
//!
//! `draw-log/2024-05` lives at `<data_dir>/draw-log/2024-05.json`. Writes go
//! to a temporary sibling that is synced and then renamed over the target.
//! An exclusive lock on `<data_dir>/.lock` keeps a second process out while
//! the store is open.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs4::fs_std::FileExt;
use tracing::debug;

use crate::{validate_key, Result, StateStore, StorageError};

const EXTENSION: &str = "json";
const LOCK_FILE: &str = ".lock";

/// File-per-key snapshot storage
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
    /// Held for the lifetime of every clone; dropping the last one unlocks
    _lock: Arc<File>,
}

impl FileStore {
    /// Open storage directory, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data_dir = path.as_ref().to_path_buf();

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(data_dir.join(LOCK_FILE))?;
        if !FileExt::try_lock_exclusive(&lock)? {
            return Err(StorageError::Locked(data_dir));
        }
        debug!(path = %data_dir.display(), "state directory locked");

        Ok(Self {
            data_dir,
            _lock: Arc::new(lock),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        let mut path = self.data_dir.clone();
        let mut segments = key.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{}.{}", segment, EXTENSION));
            }
        }
        Ok(path)
    }

    fn collect_keys(&self, dir: &Path, prefix: &str, keys: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if path.is_dir() {
                self.collect_keys(&path, &format!("{}{}/", prefix, name), keys)?;
            } else if let Some(stem) = name.strip_suffix(".json") {
                keys.push(format!("{}{}", prefix, stem));
            }
        }
        Ok(())
    }
}

impl StateStore for FileStore {
    fn load_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn save_raw(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(&self.data_dir).to_path_buf();
        fs::create_dir_all(&parent)?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        {
            let mut tmp = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            tmp.write_all(bytes)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        // Persist the rename itself; not every platform can sync a directory
        if let Ok(dir) = File::open(&parent) {
            let _ = dir.sync_all();
        }

        debug!(key, bytes = bytes.len(), path = %path.display(), "snapshot saved");
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        self.collect_keys(&self.data_dir, "", &mut keys)?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}
