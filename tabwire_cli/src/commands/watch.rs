//! Follow a tab's request log live
//!
//! Spawns a capture session for tab identity plus a live view over the shared
//! snapshot file. Another tabwire process importing into the same tab shows
//! up here within one polling sweep.

use crate::config::Config;
use anyhow::Result;
use console::style;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tabwire_core::{CaptureSession, LiveView, PageInfo, Record, StaticPage, ViewOptions};
use tokio::sync::mpsc;

pub async fn run(config: &Config, tab: i64, interval_ms: Option<u64>) -> Result<()> {
    let store = config.open_store()?;

    // seed page identity from what the store already knows about this tab
    let info = store
        .get_tabs()
        .await
        .into_iter()
        .find(|t| t.tab_id == tab)
        .map(|t| PageInfo::new(t.url, t.title))
        .unwrap_or_else(|| PageInfo::new("unknown", "Unknown"));

    let page = Arc::new(StaticPage::new(Some(tab), info));
    let (events_tx, events_rx) = mpsc::channel(1);
    drop(events_tx); // watch-only: no event source in this process
    let session = CaptureSession::spawn(store.clone(), page, events_rx);

    let poll_interval = interval_ms
        .map(|ms| Duration::from_millis(ms.max(1)))
        .unwrap_or_else(|| config.poll_interval());

    // seed the seen-set before the view starts so the backlog is not replayed
    let initial = store.get_requests(tab).await;
    let mut seen: HashSet<String> = initial.iter().map(|r| r.id.clone()).collect();
    println!(
        "Watching tab {} ({} requests so far, poll every {:?}). Ctrl+C to stop.",
        tab,
        initial.len(),
        poll_interval
    );

    let view = LiveView::connect(
        store,
        session.handle(),
        ViewOptions {
            poll_interval,
            fallback_tab_id: Some(tab),
        },
    );
    let mut versions = view.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            changed = versions.changed() => {
                if changed.is_err() {
                    break; // view task is gone
                }
                let snapshot = view.snapshot().await;
                // newest first; print newly seen entries oldest first
                for record in snapshot.iter().rev() {
                    if seen.insert(record.id.clone()) {
                        print_record(record);
                    }
                }
            }
        }
    }

    view.close();
    session.shutdown();
    println!();
    println!("Stopped watching tab {}.", tab);
    Ok(())
}

fn print_record(record: &Record) {
    println!(
        "{} {:<7} {:<4} {}",
        style(record.timestamp.format("%H:%M:%S%.3f")).dim(),
        record.method,
        record.status_code,
        record.url
    );
}
