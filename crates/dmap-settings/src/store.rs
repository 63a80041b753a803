//! Key-value persistence for settings records.
//!
//! Values are JSON strings keyed by the record's [`ConfigRecord::KEY`](crate::ConfigRecord::KEY).

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::SettingsResult;

/// Backing store for persisted records.
pub trait SettingsStore: Send + Sync {
    /// Raw value for `key`, or `None` when absent.
    fn read(&self, key: &str) -> SettingsResult<Option<String>>;

    fn write(&self, key: &str, value: &str) -> SettingsResult<()>;

    fn remove(&self, key: &str) -> SettingsResult<()>;

    /// Last modification time, used to detect changes made by another process.
    fn modified(&self, key: &str) -> Option<SystemTime>;
}

/// One `<key>.json` file per record under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create) the store directory.
    pub fn open(dir: impl AsRef<Path>) -> SettingsResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SettingsStore for FileStore {
    fn read(&self, key: &str) -> SettingsResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> SettingsResult<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));

        // Write then rename so readers never observe a half-written record.
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        debug!(key, path = %path.display(), bytes = value.len(), "Record persisted");
        Ok(())
    }

    fn remove(&self, key: &str) -> SettingsResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn modified(&self, key: &str) -> Option<SystemTime> {
        fs::metadata(self.path_for(key))
            .and_then(|m| m.modified())
            .ok()
    }
}

/// In-process store. Used in tests and when persistence is disabled.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, (String, SystemTime)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn read(&self, key: &str) -> SettingsResult<Option<String>> {
        Ok(self.entries.read().get(key).map(|(v, _)| v.clone()))
    }

    fn write(&self, key: &str, value: &str) -> SettingsResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), (value.to_string(), SystemTime::now()));
        Ok(())
    }

    fn remove(&self, key: &str) -> SettingsResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn modified(&self, key: &str) -> Option<SystemTime> {
        self.entries.read().get(key).map(|(_, at)| *at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert!(store.read("density-map-settings").unwrap().is_none());
        assert!(store.modified("density-map-settings").is_none());

        store.write("density-map-settings", r#"{"maxOrders":5}"#).unwrap();
        assert_eq!(
            store.read("density-map-settings").unwrap().as_deref(),
            Some(r#"{"maxOrders":5}"#)
        );
        assert!(dir.path().join("density-map-settings.json").exists());
        assert!(!dir.path().join(".density-map-settings.json.tmp").exists());
        assert!(store.modified("density-map-settings").is_some());

        store.remove("density-map-settings").unwrap();
        assert!(store.read("density-map-settings").unwrap().is_none());
        // Removing again is not an error.
        store.remove("density-map-settings").unwrap();
    }

    #[test]
    fn test_file_store_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::open(&nested).unwrap();
        store.write("k", "v").unwrap();
        assert!(nested.join("k.json").exists());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.read("k").unwrap().is_none());
        store.write("k", "1").unwrap();
        store.write("k", "2").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("2"));
        assert!(store.modified("k").is_some());
        store.remove("k").unwrap();
        assert!(store.modified("k").is_none());
    }
}
