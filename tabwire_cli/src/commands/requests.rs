//! Request listing, detail view and clearing

use super::truncate;
use crate::config::Config;
use anyhow::Result;
use console::style;
use tabwire_core::{format_body, search, Record};

/// List captured requests for one tab, or across all tabs
pub async fn list(
    config: &Config,
    tab: Option<i64>,
    all: bool,
    keyword: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let store = config.open_store()?;

    let records = match (tab, all) {
        (Some(tab), false) => store.get_requests(tab).await,
        (None, true) => store.get_all_requests().await,
        (Some(_), true) => anyhow::bail!("Pass a tab id or --all, not both"),
        (None, false) => anyhow::bail!("Pass a tab id, or --all for every tab"),
    };

    let filtered = search::filter_records(&records, keyword.unwrap_or(""));

    if json {
        println!("{}", serde_json::to_string_pretty(&filtered)?);
        return Ok(());
    }

    println!(
        "{} / {} requests",
        style(filtered.len()).bold(),
        records.len()
    );
    if filtered.is_empty() {
        return Ok(());
    }
    println!(
        "{:<7} {:<6} {:<52} {:<13} {:<20}",
        "METHOD", "STATUS", "URL", "TIME", "ID"
    );
    println!("{}", "-".repeat(100));

    for record in filtered.iter().take(limit) {
        println!(
            "{:<7} {:<6} {:<52} {:<13} {:<20}",
            record.method,
            record.status_code,
            truncate(&record.url, 50),
            record.timestamp.format("%H:%M:%S%.3f"),
            truncate(&record.id, 18)
        );
    }

    if filtered.len() > limit {
        println!("... {} more (raise with --limit)", filtered.len() - limit);
    }

    Ok(())
}

/// Show one captured request in full
pub async fn show(config: &Config, tab: i64, id: &str) -> Result<()> {
    let store = config.open_store()?;
    let records = store.get_requests(tab).await;

    let record = find_record(&records, id)
        .ok_or_else(|| anyhow::anyhow!("No request {} in tab {}", id, tab))?;

    println!(
        "{} {} {}",
        style(&record.method).bold(),
        record.url,
        style(format!("{} {}", record.status_code, record.status_text)).dim()
    );
    println!("{} {}", style("captured:").dim(), record.timestamp.to_rfc3339());
    if let Some(duration) = record.duration {
        println!("{} {} bytes (headers + body)", style("payload:").dim(), duration);
    }
    if let Some(elapsed) = record.elapsed_ms {
        println!("{} {} ms", style("elapsed:").dim(), elapsed);
    }

    println!();
    println!("{}", style("request headers").underlined());
    for (name, value) in &record.request_headers {
        println!("  {}: {}", name, value);
    }

    println!();
    println!("{}", style("response headers").underlined());
    for (name, value) in &record.response_headers {
        println!("  {}: {}", name, value);
    }

    println!();
    println!("{}", style("body").underlined());
    let body = format_body(
        &record.response_body,
        &record.content_type,
        record.response_body_parsed.as_ref(),
    );
    println!("{}", body.formatted);

    Ok(())
}

/// Empty a tab's request log
pub async fn clear(config: &Config, tab: i64) -> Result<()> {
    let store = config.open_store()?;
    store.clear_requests(tab).await;
    println!("Cleared requests for tab {}.", tab);
    Ok(())
}

/// Match by exact id first, then by unique prefix
fn find_record<'a>(records: &'a [Record], id: &str) -> Option<&'a Record> {
    if let Some(exact) = records.iter().find(|r| r.id == id) {
        return Some(exact);
    }
    let mut by_prefix = records.iter().filter(|r| r.id.starts_with(id));
    match (by_prefix.next(), by_prefix.next()) {
        (Some(record), None) => Some(record),
        _ => None,
    }
}
