//! Capture coordinator: one session per inspected tab
//!
//! The session task owns the intake side of the pipeline. It resolves the
//! inspected tab's identity, drives classifier -> normalizer -> store for
//! every finished exchange, and answers display-surface commands over a
//! request/response channel. Every command is answered even when something
//! inside failed; callers never hang on a dropped reply.

use crate::event::{CaptureEvent, RawExchange};
use crate::record::{PageInfo, Record};
use crate::store::TabStore;
use crate::{filter, normalize};
use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 32;

/// Host-provided view of the page under inspection.
#[async_trait]
pub trait InspectedPage: Send + Sync {
    /// Numeric id of the inspected tab; `None` when the host cannot tell.
    async fn tab_id(&self) -> Option<i64>;

    /// Current top-level url/title of the page.
    async fn page_info(&self) -> Option<PageInfo>;
}

/// Fixed page identity for hosts that know the answer up front.
pub struct StaticPage {
    tab_id: Option<i64>,
    info: PageInfo,
}

impl StaticPage {
    pub fn new(tab_id: Option<i64>, info: PageInfo) -> Self {
        Self { tab_id, info }
    }
}

#[async_trait]
impl InspectedPage for StaticPage {
    async fn tab_id(&self) -> Option<i64> {
        self.tab_id
    }

    async fn page_info(&self) -> Option<PageInfo> {
        Some(self.info.clone())
    }
}

/// Reply to [`PanelHandle::get_requests`]. `tab_id` is meaningless when
/// `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct RequestsReply {
    pub requests: Vec<Record>,
    pub tab_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to [`PanelHandle::clear_requests`].
#[derive(Debug, Clone, Serialize)]
pub struct ClearReply {
    pub success: bool,
    pub tab_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to [`PanelHandle::get_tab_id`].
#[derive(Debug, Clone, Serialize)]
pub struct TabIdReply {
    pub tab_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Commands a display surface sends to its capture session.
#[derive(Debug)]
pub enum PanelCommand {
    GetRequests { respond: oneshot::Sender<RequestsReply> },
    ClearRequests { respond: oneshot::Sender<ClearReply> },
    GetTabId { respond: oneshot::Sender<TabIdReply> },
}

/// Cloneable caller side of the session's command channel.
#[derive(Debug, Clone)]
pub struct PanelHandle {
    commands: mpsc::Sender<PanelCommand>,
}

impl PanelHandle {
    pub async fn get_requests(&self) -> RequestsReply {
        let (tx, rx) = oneshot::channel();
        if self
            .commands
            .send(PanelCommand::GetRequests { respond: tx })
            .await
            .is_err()
        {
            return RequestsReply {
                requests: Vec::new(),
                tab_id: 0,
                error: Some("capture session is gone".into()),
            };
        }
        rx.await.unwrap_or_else(|_| RequestsReply {
            requests: Vec::new(),
            tab_id: 0,
            error: Some("capture session dropped the request".into()),
        })
    }

    pub async fn clear_requests(&self) -> ClearReply {
        let (tx, rx) = oneshot::channel();
        if self
            .commands
            .send(PanelCommand::ClearRequests { respond: tx })
            .await
            .is_err()
        {
            return ClearReply {
                success: false,
                tab_id: 0,
                error: Some("capture session is gone".into()),
            };
        }
        rx.await.unwrap_or_else(|_| ClearReply {
            success: false,
            tab_id: 0,
            error: Some("capture session dropped the request".into()),
        })
    }

    pub async fn get_tab_id(&self) -> TabIdReply {
        let (tx, rx) = oneshot::channel();
        if self
            .commands
            .send(PanelCommand::GetTabId { respond: tx })
            .await
            .is_err()
        {
            return TabIdReply {
                tab_id: 0,
                error: Some("capture session is gone".into()),
            };
        }
        rx.await.unwrap_or_else(|_| TabIdReply {
            tab_id: 0,
            error: Some("capture session dropped the request".into()),
        })
    }
}

/// A running capture session. Dropping it (and every cloned handle) lets the
/// session task drain remaining events and exit.
pub struct CaptureSession {
    handle: PanelHandle,
    task: JoinHandle<()>,
}

impl CaptureSession {
    /// Spawn the session task over an event stream.
    pub fn spawn(
        store: TabStore,
        page: Arc<dyn InspectedPage>,
        events: mpsc::Receiver<CaptureEvent>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run_session(store, page, events, rx));
        Self {
            handle: PanelHandle { commands: tx },
            task,
        }
    }

    pub fn handle(&self) -> PanelHandle {
        self.handle.clone()
    }

    /// Wait for the session to drain its event stream and exit. Callers must
    /// drop their cloned handles first or this never resolves.
    pub async fn join(self) {
        let Self { handle, task } = self;
        drop(handle);
        let _ = task.await;
    }

    /// Tear the session down immediately, host-UI-teardown style. Queued
    /// events are discarded; surviving handles get error replies.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

async fn run_session(
    store: TabStore,
    page: Arc<dyn InspectedPage>,
    mut events: mpsc::Receiver<CaptureEvent>,
    mut commands: mpsc::Receiver<PanelCommand>,
) {
    store.cleanup_old_tabs().await;

    let tab_id = resolve_tab_id(page.as_ref()).await;
    let seed = page
        .page_info()
        .await
        .unwrap_or_else(|| PageInfo::new("unknown", "Unknown"));
    store.update_tab(tab_id, &seed.url, &seed.title).await;
    tracing::info!(tab_id, url = %seed.url, "capture session active");

    let mut events_open = true;
    let mut commands_open = true;

    while events_open || commands_open {
        tokio::select! {
            // drain captured events before answering reads so a caller that
            // queued events then asks sees them all
            biased;

            event = events.recv(), if events_open => match event {
                Some(CaptureEvent::RequestFinished(exchange)) => {
                    handle_exchange(&store, page.as_ref(), tab_id, &exchange).await;
                }
                Some(CaptureEvent::Navigated { url }) => {
                    store.update_tab(tab_id, &url, "Loading...").await;
                }
                None => events_open = false,
            },

            command = commands.recv(), if commands_open => match command {
                Some(command) => handle_command(&store, tab_id, command).await,
                None => commands_open = false,
            },
        }
    }

    tracing::debug!(tab_id, "capture session ended");
}

async fn resolve_tab_id(page: &dyn InspectedPage) -> i64 {
    match page.tab_id().await {
        Some(id) => id,
        None => {
            // Ephemeral negative id. A shared fixed fallback would silently
            // merge logs from unrelated sessions.
            let id = -(rand::thread_rng().gen_range(1..=i64::from(i32::MAX)));
            tracing::warn!(tab_id = id, "inspected tab id unavailable, using ephemeral session id");
            id
        }
    }
}

async fn handle_exchange(
    store: &TabStore,
    page: &dyn InspectedPage,
    tab_id: i64,
    exchange: &RawExchange,
) {
    if !filter::is_api_exchange(exchange) {
        return;
    }
    let Some(record) = normalize::normalize(exchange).await else {
        return;
    };

    // The metadata refresh and the log append hit independent keys; their
    // completion order is not significant.
    let info = page.page_info().await;
    let refresh_tab = async {
        if let Some(info) = &info {
            store.update_tab(tab_id, &info.url, &info.title).await;
        }
    };
    tokio::join!(refresh_tab, store.add_request(tab_id, record));

    store.touch_update(tab_id).await;
}

async fn handle_command(store: &TabStore, tab_id: i64, command: PanelCommand) {
    match command {
        PanelCommand::GetRequests { respond } => {
            let requests = store.get_requests(tab_id).await;
            let _ = respond.send(RequestsReply {
                requests,
                tab_id,
                error: None,
            });
        }
        PanelCommand::ClearRequests { respond } => {
            store.clear_requests(tab_id).await;
            let _ = respond.send(ClearReply {
                success: true,
                tab_id,
                error: None,
            });
        }
        PanelCommand::GetTabId { respond } => {
            let _ = respond.send(TabIdReply {
                tab_id,
                error: None,
            });
        }
    }
}
