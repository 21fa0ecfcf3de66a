//! Persistent key-value substrate consumed by the tab store
//!
//! String-keyed async get/set/remove over JSON values, plus a best-effort
//! change-notification stream. No transactions and no multi-key atomicity;
//! callers that need certainty re-read and compare.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of the change broadcast. A lagging watcher drops notifications
/// and recovers through its polling sweep.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// One observed key transition.
#[derive(Debug, Clone)]
pub struct KeyChange {
    pub key: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Subscribe to change notifications. Delivery is best-effort and
    /// in-process only.
    fn watch(&self) -> broadcast::Receiver<KeyChange>;
}
