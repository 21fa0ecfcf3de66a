//! Tab listing and removal

use super::truncate;
use crate::config::Config;
use anyhow::Result;

/// List all tracked tabs
pub async fn list(config: &Config) -> Result<()> {
    let store = config.open_store()?;
    store.cleanup_old_tabs().await;

    let mut tabs = store.get_tabs().await;
    if tabs.is_empty() {
        println!("No tabs tracked.");
        println!();
        println!("Ingest a capture with: tabwire import <FILE>");
        return Ok(());
    }

    tabs.sort_by(|a, b| b.last_active.cmp(&a.last_active));

    println!(
        "{:<12} {:<28} {:<40} {:<17} {:>8}",
        "TAB", "TITLE", "URL", "LAST ACTIVE", "REQUESTS"
    );
    println!("{}", "-".repeat(108));

    for tab in tabs {
        let count = store.get_requests(tab.tab_id).await.len();
        println!(
            "{:<12} {:<28} {:<40} {:<17} {:>8}",
            tab.tab_id,
            truncate(&tab.title, 26),
            truncate(&tab.url, 38),
            tab.last_active.format("%Y-%m-%d %H:%M"),
            count
        );
    }

    Ok(())
}

/// Remove a tab's metadata and request log
pub async fn remove(config: &Config, tab: i64) -> Result<()> {
    let store = config.open_store()?;

    if !store.get_tabs().await.iter().any(|t| t.tab_id == tab) {
        println!("Tab {} is not tracked.", tab);
        return Ok(());
    }

    store.remove_tab(tab).await;
    println!("Removed tab {} and its request log.", tab);
    Ok(())
}
