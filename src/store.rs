// MIT License - Copyright (c) 2026 Peter Wright
// Shared state store

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::Result;

/// Host-provided key-value store shared across flow nodes.
///
/// The panel persists its mode and alarm type here so they survive restarts.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<i64>;
    fn set(&self, key: &str, value: i64) -> Result<()>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `entries`.
    pub fn with_values<'a>(entries: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<i64> {
        lock(&self.values).get(key).copied()
    }

    fn set(&self, key: &str, value: i64) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a JSON object file, rewritten on every `set`.
///
/// A missing or unreadable file at open time starts the store empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, i64>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Ignoring unreadable store file {}: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Store file {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Failed to read store file {}: {e}", path.display());
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Option<i64> {
        lock(&self.values).get(key).copied()
    }

    fn set(&self, key: &str, value: i64) -> Result<()> {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), value);
        let json = serde_json::to_string_pretty(&*values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;

    #[test]
    fn test_memory_store_get_set() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a"), None);
        store.set("a", 3).unwrap();
        assert_eq!(store.get("a"), Some(3));
        store.set("a", 4).unwrap();
        assert_eq!(store.get("a"), Some(4));
    }

    #[test]
    fn test_memory_store_seeded() {
        let store = MemoryStore::with_values([("x", 1), ("y", 2)]);
        assert_eq!(store.get("x"), Some(1));
        assert_eq!(store.get("y"), Some(2));
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStore::open(&path);
        assert_eq!(store.get("SecuritySystemCurrentState"), None);
        store.set("SecuritySystemCurrentState", 2).unwrap();
        store.set("SecuritySystemAlarmType", 0).unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("SecuritySystemCurrentState"), Some(2));
        assert_eq!(reopened.get("SecuritySystemAlarmType"), Some(0));
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("SecuritySystemCurrentState"), None);
        store.set("SecuritySystemCurrentState", 1).unwrap();
        assert_eq!(FileStore::open(&path).get("SecuritySystemCurrentState"), Some(1));
    }

    #[test]
    fn test_file_store_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("state.json");

        let store = FileStore::open(&path);
        let err = store.set("k", 1).unwrap_err();
        assert!(matches!(err, PanelError::StoreIo(_)));
        // the in-memory value is kept even though the write failed
        assert_eq!(store.get("k"), Some(1));
    }
}
