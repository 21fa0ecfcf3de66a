//! In-memory store for tests and single-process sessions

use super::{KeyChange, KeyValueStore, StorageError, CHANGE_CHANNEL_CAPACITY};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
    changes: broadcast::Sender<KeyChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let old = self.entries.write().await.insert(key.to_string(), value.clone());
        let _ = self.changes.send(KeyChange {
            key: key.to_string(),
            old,
            new: Some(value),
        });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let old = self.entries.write().await.remove(key);
        if old.is_some() {
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
    async fn set_then_get_roundtrips() {
        let store = MemoryStore::new();
        store.set("k", json!([1, 2])).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!([1, 2])));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn watch_delivers_old_and_new_values() {
        let store = MemoryStore::new();
        let mut changes = store.watch();

        store.set("k", json!(1)).await.unwrap();
        store.set("k", json!(2)).await.unwrap();
        store.remove("k").await.unwrap();

        let first = changes.recv().await.unwrap();
        assert_eq!((first.old, first.new), (None, Some(json!(1))));

        let second = changes.recv().await.unwrap();
        assert_eq!((second.old, second.new), (Some(json!(1)), Some(json!(2))));

        let removed = changes.recv().await.unwrap();
        assert_eq!((removed.old, removed.new), (Some(json!(2)), None));
    }

    #[tokio::test]
    async fn removing_an_absent_key_is_silent() {
        let store = MemoryStore::new();
        let mut changes = store.watch();
        store.remove("missing").await.unwrap();
        assert!(changes.try_recv().is_err());
    }
}
