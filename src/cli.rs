//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use harvester_core::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_WORKERS};

/// Harvest documents concurrently and keep their metadata consistent.
///
/// Harvester fetches artifacts with a bounded worker pool, records each one in
/// a JSON metadata document, and repairs failed or missing artifacts on demand.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/harvester/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch artifacts listed as URLs or JSON task lines
    Harvest(HarvestArgs),
    /// Re-fetch failed or missing artifacts recorded in a metadata directory
    Reconcile(ReconcileArgs),
    /// Extract text, paragraphs and document facts from harvested files
    Process(ProcessArgs),
}

/// Fetch tuning shared by both subcommands.
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Maximum fetch attempts per artifact (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Fixed delay between attempts in seconds (0-3600)
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_RETRY_DELAY.as_secs(), value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub retry_delay: u64,
}

#[derive(Args, Debug, Clone)]
pub struct HarvestArgs {
    /// URLs or JSON task objects (read from stdin when omitted)
    pub inputs: Vec<String>,

    /// Directory receiving artifacts and metadata documents
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of concurrent workers (1-100)
    #[arg(short, long, default_value_t = DEFAULT_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub workers: u8,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Run a reconciliation pass over the output directory afterwards
    #[arg(long)]
    pub reconcile: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    /// Metadata directory to scan
    pub dir: PathBuf,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// Directory of harvested files to walk recursively
    pub dir: PathBuf,

    /// Write extracted facts and paragraphs as a JSON array to this file
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,
}
