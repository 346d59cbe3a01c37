//! Command-line interface for binlog-index-sync
//!
//! # Usage Examples
//!
//! ```bash
//! # Backfill on first start, then follow the binlog
//! binlog-index-sync run --config /etc/binlog-index-sync.yaml
//!
//! # Show the position a restart would resume from
//! binlog-index-sync checkpoint --config /etc/binlog-index-sync.yaml
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::Context;
use binlog_index_sync::config::Config;
use binlog_index_sync::full_sync::DEFAULT_PAGE_SIZE;
use binlog_index_sync::sync::SyncSession;
use checkpoint::{Checkpoint, CheckpointFile};
use clap::{Parser, Subcommand};
use meilisearch_sink::meilisearch_connect;
use mysql_binlog_source::{new_mysql_pool, MySQLBinlogSource, MySQLTableReader, ReplicationPosition};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "binlog-index-sync")]
#[command(about = "Keep Meilisearch indexes in sync with MySQL tables through the binlog")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure indexes, backfill if no checkpoint exists, then stream the binlog
    Run {
        /// Path to the YAML config file
        #[arg(long, env = "BINLOG_INDEX_SYNC_CONFIG")]
        config: PathBuf,

        /// Rows per page during the backfill
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u64,
    },

    /// Print the stored checkpoint
    Checkpoint {
        /// Path to the YAML config file
        #[arg(long, env = "BINLOG_INDEX_SYNC_CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, page_size } => run_sync(config, page_size).await,
        Commands::Checkpoint { config } => show_checkpoint(config).await,
    }
}

async fn run_sync(config_path: PathBuf, page_size: u64) -> anyhow::Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {config_path:?}"))?;

    info!(
        "Syncing {} tables from mysql://{}@{}:{} to {}",
        config.sync.len(),
        config.mysql.user,
        config.mysql.host,
        config.mysql.port,
        config.meilisearch.host
    );

    let pool = new_mysql_pool(config.mysql_opts());
    let sink = meilisearch_connect(&config.meilisearch_opts()).await?;

    let session = SyncSession::new(
        MySQLBinlogSource::new(pool.clone(), config.mysql.server_id),
        MySQLTableReader::new(pool.clone()),
        sink,
        config.sync_rules(),
        CheckpointFile::in_dir(&config.mysql.checkpoint_dir),
    )
    .with_page_size(page_size);

    let cancel = CancellationToken::new();
    let shutdown = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received interrupt signal (Ctrl+C)");
                cancel.cancel();
            }
        })
    };

    let result = session.run(cancel).await;
    shutdown.abort();

    pool.disconnect().await?;
    result
}

async fn show_checkpoint(config_path: PathBuf) -> anyhow::Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {config_path:?}"))?;

    let file: CheckpointFile<ReplicationPosition> =
        CheckpointFile::in_dir(&config.mysql.checkpoint_dir);
    match file.read().await? {
        Some(position) => println!("{}", position.to_cli_string()),
        None => println!("no checkpoint"),
    }
    Ok(())
}
