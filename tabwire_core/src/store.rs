//! Tab-scoped persistence over the key-value substrate
//!
//! One request log per inspected tab plus a global tab-metadata list, all
//! stored under a namespace prefix. Storage failures degrade to "empty / did
//! nothing" and are logged; they never reach the capture pipeline.
//!
//! The log read-modify-write is not atomic across processes. The design
//! assumes a single writer per tab-scoped key during an active session;
//! concurrent writers race last-write-wins.

use crate::backend::{KeyChange, KeyValueStore, StorageError};
use crate::record::{Record, TabInfo};
use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

pub const DEFAULT_NAMESPACE: &str = "tabwire_";
pub const MAX_REQUESTS_PER_TAB: usize = 1000;
pub const TAB_MAX_AGE_HOURS: i64 = 24;

#[derive(Clone)]
pub struct TabStore {
    backend: Arc<dyn KeyValueStore>,
    namespace: String,
    max_requests_per_tab: usize,
    tab_max_age: Duration,
}

impl TabStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limits(
            backend,
            DEFAULT_NAMESPACE,
            MAX_REQUESTS_PER_TAB,
            Duration::hours(TAB_MAX_AGE_HOURS),
        )
    }

    pub fn with_limits(
        backend: Arc<dyn KeyValueStore>,
        namespace: impl Into<String>,
        max_requests_per_tab: usize,
        tab_max_age: Duration,
    ) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            max_requests_per_tab,
            tab_max_age,
        }
    }

    pub fn requests_key(&self, tab_id: i64) -> String {
        format!("{}requests_{}", self.namespace, tab_id)
    }

    pub fn tabs_key(&self) -> String {
        format!("{}tabs", self.namespace)
    }

    /// Change-notification timestamp key for one tab.
    pub fn update_key(&self, tab_id: i64) -> String {
        format!("{}update_{}", self.namespace, tab_id)
    }

    /// Raw change stream of the underlying substrate.
    pub fn watch(&self) -> broadcast::Receiver<KeyChange> {
        self.backend.watch()
    }

    /// All tracked tabs, unordered.
    pub async fn get_tabs(&self) -> Vec<TabInfo> {
        self.read(&self.tabs_key()).await.unwrap_or_default()
    }

    /// Upsert a tab's metadata, refreshing `last_active`.
    pub async fn update_tab(&self, tab_id: i64, url: &str, title: &str) {
        let mut tabs = self.get_tabs().await;
        let now = Utc::now();

        match tabs.iter_mut().find(|t| t.tab_id == tab_id) {
            Some(existing) => {
                existing.url = url.to_string();
                existing.title = title.to_string();
                // keep last_active monotonic even if the clock steps back
                existing.last_active = existing.last_active.max(now);
            }
            None => tabs.push(TabInfo {
                tab_id,
                url: url.to_string(),
                title: title.to_string(),
                last_active: now,
            }),
        }

        self.write(&self.tabs_key(), &tabs).await;
    }

    /// Remove a tab's metadata and its request log. Metadata goes first; a
    /// crash between the two writes leaves an orphan log that reads as empty
    /// and is wiped by the next cleanup pass.
    pub async fn remove_tab(&self, tab_id: i64) {
        let tabs: Vec<TabInfo> = self
            .get_tabs()
            .await
            .into_iter()
            .filter(|t| t.tab_id != tab_id)
            .collect();
        self.write(&self.tabs_key(), &tabs).await;

        self.delete(&self.requests_key(tab_id)).await;
        self.delete(&self.update_key(tab_id)).await;
    }

    /// Remove every tab idle past the retention window. Idempotent; run at
    /// session start.
    pub async fn cleanup_old_tabs(&self) {
        let now = Utc::now();
        for tab in self.get_tabs().await {
            if now - tab.last_active > self.tab_max_age {
                tracing::debug!(tab_id = tab.tab_id, "removing stale tab");
                self.remove_tab(tab.tab_id).await;
            }
        }
    }

    /// Request log for one tab, newest first.
    pub async fn get_requests(&self, tab_id: i64) -> Vec<Record> {
        self.read(&self.requests_key(tab_id)).await.unwrap_or_default()
    }

    /// Prepend a record to a tab's log, evicting past the capacity bound.
    pub async fn add_request(&self, tab_id: i64, record: Record) {
        let mut requests = self.get_requests(tab_id).await;
        requests.insert(0, record);
        requests.truncate(self.max_requests_per_tab);
        self.write(&self.requests_key(tab_id), &requests).await;
    }

    /// Empty a tab's log; metadata is untouched.
    pub async fn clear_requests(&self, tab_id: i64) {
        self.write(&self.requests_key(tab_id), &Vec::<Record>::new()).await;
    }

    /// Every record across every tracked tab, newest first. Reads each log in
    /// turn; diagnostics only, not the hot path.
    pub async fn get_all_requests(&self) -> Vec<Record> {
        let mut all = Vec::new();
        for tab in self.get_tabs().await {
            all.extend(self.get_requests(tab.tab_id).await);
        }
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all
    }

    /// Bump the per-tab change-notification key so watching views refetch.
    pub async fn touch_update(&self, tab_id: i64) {
        self.write(&self.update_key(tab_id), &Utc::now().timestamp_millis()).await;
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend.get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(decoded) => Some(decoded),
                Err(err) => {
                    tracing::warn!(key, "discarding undecodable entry: {}", err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key, "storage read failed: {}", err);
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) {
        let encoded = match serde_json::to_value(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(key, "storage encode failed: {}", err);
                return;
            }
        };
        if let Err(err) = self.backend.set(key, encoded).await {
            tracing::warn!(key, "storage write failed: {}", err);
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(err) = self.backend.remove(key).await {
            tracing::warn!(key, "storage delete failed: {}", err);
        }
    }
}
