use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "topic-loader",
    version,
    about = "Bulk-load exported discussion topics into a SQLite store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Migrate(MigrateArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Folder holding one JSON document per topic.
    #[arg(long, default_value = "backup")]
    pub folder: PathBuf,

    #[arg(long, default_value = "topics.sqlite")]
    pub db_path: PathBuf,

    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    #[arg(long, default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Create any missing tables before loading.
    #[arg(long, default_value_t = false)]
    pub migrate: bool,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    #[arg(long, default_value = "topics.sqlite")]
    pub db_path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "topics.sqlite")]
    pub db_path: PathBuf,
}
