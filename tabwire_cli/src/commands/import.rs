//! Ingest a HAR capture through the full pipeline

use crate::config::Config;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tabwire_core::{har, CaptureEvent, CaptureSession, PageInfo, StaticPage};
use tokio::sync::mpsc;

pub async fn run(
    config: &Config,
    file: &Path,
    tab: Option<i64>,
    url: Option<String>,
    title: Option<String>,
) -> Result<()> {
    let events = har::read_har_file(file)
        .with_context(|| format!("Failed to read capture from {}", file.display()))?;
    let total = events.len();

    let store = config.open_store()?;

    // page identity: explicit flags win, then the first recorded navigation
    let first_navigation = events.iter().find_map(|event| match event {
        CaptureEvent::Navigated { url } => Some(url.clone()),
        _ => None,
    });
    let page_url = url.or(first_navigation).unwrap_or_else(|| "unknown".to_string());
    let page_title = title.unwrap_or_else(|| "Unknown".to_string());

    let page = Arc::new(StaticPage::new(tab, PageInfo::new(page_url, page_title)));
    let (tx, rx) = mpsc::channel(64);
    let session = CaptureSession::spawn(store, page, rx);
    let handle = session.handle();

    for event in events {
        // the session only stops reading if it died; surface that instead of
        // importing half an archive silently
        tx.send(event).await.context("Capture session ended early")?;
    }
    drop(tx);

    // commands are answered after the queued events, so this doubles as a
    // completion barrier
    let reply = handle.get_requests().await;
    if let Some(err) = reply.error {
        anyhow::bail!("Import failed: {}", err);
    }

    println!(
        "{} {} entries; tab {} now holds {} requests",
        style("Processed").green().bold(),
        total,
        reply.tab_id,
        reply.requests.len()
    );
    println!("Browse them with: tabwire requests {}", reply.tab_id);

    drop(handle);
    session.join().await;
    Ok(())
}
