//! Display-side live cache over one tab's stored records
//!
//! Change notifications from the storage substrate give low latency; a
//! periodic polling sweep re-fetches and compares, guaranteeing eventual
//! consistency within one interval when a notification is lost. The cache is
//! an explicit object whose lifetime is tied to `connect`/`close`, shared by
//! any number of subscribers.

use crate::record::Record;
use crate::session::PanelHandle;
use crate::store::TabStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Polling sweep cadence.
    pub poll_interval: Duration,

    /// Tab id to fall back on while the capture session cannot report one.
    pub fallback_tab_id: Option<i64>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            fallback_tab_id: None,
        }
    }
}

struct ViewShared {
    records: RwLock<Arc<Vec<Record>>>,
    tab_id: RwLock<Option<i64>>,
    version: watch::Sender<u64>,
}

impl ViewShared {
    fn new() -> Self {
        Self {
            records: RwLock::new(Arc::new(Vec::new())),
            tab_id: RwLock::new(None),
            version: watch::channel(0).0,
        }
    }

    /// Replace the cached set; bumps the version only on an actual change.
    async fn install(&self, records: Vec<Record>) {
        let mut slot = self.records.write().await;
        if **slot == records {
            return;
        }
        *slot = Arc::new(records);
        drop(slot);
        self.version.send_modify(|v| *v += 1);
    }
}

/// Live, shared view of one tab's record set.
pub struct LiveView {
    shared: Arc<ViewShared>,
    panel: PanelHandle,
    task: JoinHandle<()>,
}

impl LiveView {
    /// Start synchronizing. The tab id is resolved through `panel` before the
    /// first fetch; until resolution succeeds the view retries on every poll
    /// tick and re-fetches once the real id is known.
    pub fn connect(store: TabStore, panel: PanelHandle, options: ViewOptions) -> Self {
        let shared = Arc::new(ViewShared::new());
        // subscribe before the task starts so changes arriving during the
        // initial fetch are buffered, not lost
        let changes = store.watch();
        let task = tokio::spawn(run_view(
            store,
            panel.clone(),
            options,
            Arc::clone(&shared),
            changes,
        ));
        Self {
            shared,
            panel,
            task,
        }
    }

    /// Current cached record set, newest first.
    pub async fn snapshot(&self) -> Arc<Vec<Record>> {
        Arc::clone(&*self.shared.records.read().await)
    }

    /// Version counter bumped on every detected change. Receivers re-read
    /// [`LiveView::snapshot`] when it moves.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version.subscribe()
    }

    pub async fn tab_id(&self) -> Option<i64> {
        *self.shared.tab_id.read().await
    }

    /// Clear the tab's log through the capture session and reset the local
    /// cache immediately without waiting for a round-trip.
    pub async fn clear(&self) -> crate::session::ClearReply {
        let reply = self.panel.clear_requests().await;
        self.shared.install(Vec::new()).await;
        reply
    }

    /// Stop synchronizing. An in-flight fetch is dropped with the task; no
    /// subscriber remains to observe it.
    pub fn close(self) {
        self.task.abort();
    }
}

struct TabIdState {
    id: Option<i64>,
    from_panel: bool,
}

async fn run_view(
    store: TabStore,
    panel: PanelHandle,
    options: ViewOptions,
    shared: Arc<ViewShared>,
    mut changes: broadcast::Receiver<crate::backend::KeyChange>,
) {
    let mut push_open = true;

    let mut state = fetch_tab_id(&panel, &options).await;
    if let Some(id) = state.id {
        *shared.tab_id.write().await = Some(id);
        refetch(&store, id, &shared).await;
    }

    let mut poll = tokio::time::interval(options.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    poll.reset(); // the immediate first tick duplicates the initial fetch

    loop {
        tokio::select! {
            change = changes.recv(), if push_open => match change {
                Ok(change) => {
                    if let Some(id) = state.id {
                        if change.key == store.update_key(id) || change.key == store.requests_key(id) {
                            refetch(&store, id, &shared).await;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "change stream lagged; poll sweep will catch up");
                }
                Err(broadcast::error::RecvError::Closed) => push_open = false,
            },

            _ = poll.tick() => {
                if !state.from_panel {
                    let next = fetch_tab_id(&panel, &options).await;
                    if next.from_panel {
                        // corrective fetch: the cache may have been built
                        // against the fallback id
                        if let Some(id) = next.id {
                            *shared.tab_id.write().await = Some(id);
                            refetch(&store, id, &shared).await;
                        }
                        state = next;
                    }
                }
                if let Some(id) = state.id {
                    refetch(&store, id, &shared).await;
                }
            }
        }
    }
}

async fn fetch_tab_id(panel: &PanelHandle, options: &ViewOptions) -> TabIdState {
    let reply = panel.get_tab_id().await;
    match reply.error {
        None => TabIdState {
            id: Some(reply.tab_id),
            from_panel: true,
        },
        Some(err) => {
            tracing::debug!("tab id not available from capture session: {}", err);
            TabIdState {
                id: options.fallback_tab_id,
                from_panel: false,
            }
        }
    }
}

async fn refetch(store: &TabStore, tab_id: i64, shared: &ViewShared) {
    let records = store.get_requests(tab_id).await;
    shared.install(records).await;
}
