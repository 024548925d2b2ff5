use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MetaLocker node CLI, mirroring the teacher's top-level `Cli { command:
/// Commands }` shape (one `clap::Parser` struct, global args flattened
/// across every subcommand via `#[command(flatten)]`).
#[derive(Debug, Parser)]
#[command(name = "metalocker", about = "Append-only ledger node for MetaLocker")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Args)]
pub struct GlobalArgs {
    /// Path to a TOML config file. Missing file is not an error: built-in
    /// defaults apply.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// `tracing_subscriber::EnvFilter` directive, e.g. `metalocker=debug`.
    #[arg(long, global = true, default_value = "info")]
    pub log_filter: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Starts the ledger engine and blocks until Ctrl-C.
    Run(RunArgs),
    /// Opens the ledger's database and prints the genesis and top block.
    Status(RunArgs),
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Overrides the config file's `db_file`.
    #[arg(long)]
    pub db_file: Option<PathBuf>,
}
