//! Tabwire CLI - browse per-tab network captures
//!
//! Usage:
//!   tabwire import <FILE>       Ingest a HAR capture into a tab's log
//!   tabwire tabs                List tracked tabs
//!   tabwire requests <TAB>      List a tab's captured requests
//!   tabwire show <TAB> <ID>     Show one request in full
//!   tabwire clear <TAB>         Empty a tab's request log
//!   tabwire rm <TAB>            Stop tracking a tab entirely
//!   tabwire watch <TAB>         Follow a tab's log live

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tabwire")]
#[command(author = "Tabwire Team")]
#[command(version)]
#[command(about = "Capture and browse per-tab API traffic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a HAR capture into a tab's request log
    Import {
        /// Path to the .har file
        file: PathBuf,

        /// Tab id to file the capture under (default: a fresh session id)
        #[arg(short, long)]
        tab: Option<i64>,

        /// Page URL to record for the tab
        #[arg(long)]
        url: Option<String>,

        /// Page title to record for the tab
        #[arg(long)]
        title: Option<String>,
    },

    /// List tracked tabs
    Tabs,

    /// List captured requests for a tab
    Requests {
        /// Tab id (omit with --all)
        tab: Option<i64>,

        /// Keyword filter over URL and response bodies
        #[arg(short, long)]
        search: Option<String>,

        /// Every request across every tab, newest first
        #[arg(long)]
        all: bool,

        /// Maximum rows to print
        #[arg(short, long, default_value_t = 50)]
        limit: usize,

        /// Emit the matching records as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one captured request in full
    Show {
        /// Tab id
        tab: i64,

        /// Request id (or a unique prefix)
        id: String,
    },

    /// Empty a tab's request log (metadata is kept)
    Clear {
        /// Tab id
        tab: i64,
    },

    /// Stop tracking a tab: remove its metadata and log
    Rm {
        /// Tab id
        tab: i64,
    },

    /// Follow a tab's request log live
    Watch {
        /// Tab id
        tab: i64,

        /// Override the polling sweep interval
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tabwire_cli=info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    config::ensure_dirs()?;
    let config = config::Config::load()?;

    match cli.command {
        Commands::Import {
            file,
            tab,
            url,
            title,
        } => {
            commands::import::run(&config, &file, tab, url, title).await?;
        }

        Commands::Tabs => {
            commands::tabs::list(&config).await?;
        }

        Commands::Requests {
            tab,
            search,
            all,
            limit,
            json,
        } => {
            commands::requests::list(&config, tab, all, search.as_deref(), limit, json).await?;
        }

        Commands::Show { tab, id } => {
            commands::requests::show(&config, tab, &id).await?;
        }

        Commands::Clear { tab } => {
            commands::requests::clear(&config, tab).await?;
        }

        Commands::Rm { tab } => {
            commands::tabs::remove(&config, tab).await?;
        }

        Commands::Watch { tab, interval_ms } => {
            commands::watch::run(&config, tab, interval_ms).await?;
        }
    }

    Ok(())
}
