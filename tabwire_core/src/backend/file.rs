//! JSON-snapshot file store
//!
//! Every operation reads the snapshot from disk and mutations rewrite it, so
//! concurrent processes observe each other's writes on their next read.
//! Change notifications are in-process only; cross-process readers rely on
//! their polling sweep. Durability is whatever the filesystem provides.

use super::{KeyChange, KeyValueStore, StorageError, CHANGE_CHANNEL_CAPACITY};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tokio::sync::{broadcast, Mutex};

pub struct FileStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
    changes: broadcast::Sender<KeyChange>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = Self {
            path,
            write_lock: Mutex::new(()),
            changes: broadcast::channel(CHANGE_CHANNEL_CAPACITY).0,
        };
        // surface an unreadable snapshot at open instead of on first use
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn persist(&self, entries: &HashMap<String, Value>) -> Result<(), StorageError> {
        fs::write(&self.path, serde_json::to_string(entries)?)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load()?;
        let old = entries.insert(key.to_string(), value.clone());
        self.persist(&entries)?;
        let _ = self.changes.send(KeyChange {
            key: key.to_string(),
            old,
            new: Some(value),
        });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load()?;
        let old = entries.remove(key);
        if old.is_some() {
            self.persist(&entries)?;
            let _ = self.changes.send(KeyChange {
                key: key.to_string(),
                old,
                new: None,
            });
        }
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<KeyChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captures.json");

        let store = FileStore::open(&path).unwrap();
        store.set("a", json!({"n": 1})).await.unwrap();
        store.set("b", json!(true)).await.unwrap();
        store.remove("b").await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("a").await.unwrap(), Some(json!({"n": 1})));
        assert_eq!(reopened.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn reads_observe_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captures.json");

        let reader = FileStore::open(&path).unwrap();
        let writer = FileStore::open(&path).unwrap();

        writer.set("shared", json!("fresh")).await.unwrap();
        assert_eq!(reader.get("shared").await.unwrap(), Some(json!("fresh")));
    }

    #[tokio::test]
    async fn open_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/captures.json");
        let store = FileStore::open(&path).unwrap();
        store.set("k", json!(1)).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn corrupt_snapshot_fails_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captures.json");
        fs::write(&path, "not json").unwrap();
        assert!(FileStore::open(&path).is_err());
    }
}
