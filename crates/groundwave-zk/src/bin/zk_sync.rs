//! zk-sync: operator tool for the Zettelkasten cache.
//!
//! Reads `ZK_PATH` and friends from the environment (or `.env`), talks to
//! the WebDAV origin, and prints results as JSON on stdout. Logs go to
//! stderr or `LOG_FILE`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use groundwave_core::defaults::{INTERNAL_NOTE_BASE_PATH, PUBLIC_NOTE_BASE_PATH};
use groundwave_core::{CancellationToken, ZkConfig};
use groundwave_zk::{RefreshEvent, ZkCache, ZkRefresher};

#[derive(Parser)]
#[command(name = "zk-sync")]
#[command(author, version, about = "Zettelkasten cache for Groundwave")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full refresh and print build statistics
    Build,

    /// Render a note by id
    Note {
        /// Note UUID
        id: String,

        /// Render for the public site (marks links to non-public notes)
        #[arg(long)]
        public: bool,
    },

    /// Render the index note
    Index,

    /// List journal entries, newest first
    Journal,

    /// Refresh in the background until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _guard = init_logging();

    let cli = Cli::parse();
    let config = ZkConfig::from_env().context("loading configuration")?;
    let cache = Arc::new(ZkCache::from_config(config).context("creating WebDAV client")?);
    let cancel = CancellationToken::new();

    match cli.command {
        Commands::Build => {
            let report = cache.refresh_all(&cancel).await?;
            print_json(&report)?;
        }
        Commands::Note { id, public } => {
            let base_path = if public {
                cache.refresh_links(&cancel).await?;
                PUBLIC_NOTE_BASE_PATH
            } else {
                INTERNAL_NOTE_BASE_PATH
            };
            let note = cache.render_note(&id, base_path, &cancel).await?;
            print_json(&note)?;
        }
        Commands::Index => {
            let note = cache
                .render_index_note(INTERNAL_NOTE_BASE_PATH, &cancel)
                .await?;
            print_json(&note)?;
        }
        Commands::Journal => {
            cache.refresh_journal(&cancel).await?;
            print_json(&cache.get_journal_entries().await)?;
        }
        Commands::Watch => watch(cache).await?,
    }

    Ok(())
}

async fn watch(cache: Arc<ZkCache>) -> anyhow::Result<()> {
    let handle = ZkRefresher::new(cache).start();
    let mut events = handle.events();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for Ctrl-C")?;
                info!("Shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Ok(RefreshEvent::RefreshCompleted { report }) => print_json(&report)?,
                Ok(RefreshEvent::RefresherStopped) | Err(_) => break,
                Ok(_) => {}
            },
        }
    }

    handle.shutdown().await?;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `LOG_FORMAT=json` switches to JSON lines; `LOG_FILE` writes to a daily
/// rolling file instead of stderr.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "groundwave_zk=info,groundwave_webdav=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let path = Path::new(path);
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("zk-sync.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    }
}
