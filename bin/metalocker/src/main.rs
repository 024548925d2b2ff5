mod cli;
mod config;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Command, RunArgs};
use metalocker_kv::SledKv;
use metalocker_ledger::{LedgerHandle, NonceSource};
use metalocker_notify::InMemoryBus;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.global.log_filter);

    match cli.command {
        Command::Run(args) => run(cli.global.config, args).await,
        Command::Status(args) => status(cli.global.config, args).await,
    }
}

fn init_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

async fn open_handle(
    config_path: Option<std::path::PathBuf>,
    args: RunArgs,
) -> eyre::Result<LedgerHandle> {
    let file_config = config::FileConfig::load(config_path.as_deref())?;
    let db_file_override = args.db_file.map(|p| p.to_string_lossy().into_owned());
    let ledger_config = file_config.resolve(db_file_override);

    if let Some(parent) = ledger_config.db_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let kv = Arc::new(SledKv::open(&ledger_config.db_file)?);
    let notify = Arc::new(InMemoryBus::new());
    let handle = LedgerHandle::spawn(kv, notify, ledger_config, NonceSource::Random).await?;
    Ok(handle)
}

/// Starts the engine and blocks until Ctrl-C, then shuts it down.
async fn run(config_path: Option<std::path::PathBuf>, args: RunArgs) -> eyre::Result<()> {
    let handle = open_handle(config_path, args).await?;
    let genesis = handle.get_genesis_block().await?;
    tracing::info!(hash = %genesis.hash, "ledger engine started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    handle.close();
    Ok(())
}

/// Opens the ledger (running startup if this is a fresh database) and
/// prints its genesis and top block, then exits.
async fn status(config_path: Option<std::path::PathBuf>, args: RunArgs) -> eyre::Result<()> {
    let handle = open_handle(config_path, args).await?;
    let genesis = handle.get_genesis_block().await?;
    let top = handle.get_top_block().await?;

    println!("genesis: number={} hash={}", genesis.number, genesis.hash);
    println!("top:     number={} hash={}", top.number, top.hash);

    handle.close();
    Ok(())
}
