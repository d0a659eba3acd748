//! Binary-side orchestration: configuration, terminal setup and commands.

mod config;
mod config_runtime;
mod exit;
mod harvest;
mod process;
mod progress;
mod reconcile;
mod terminal;

use anyhow::Result;
use tracing::debug;

use crate::ProcessExit;
use crate::cli::Command;
use config_runtime::{
    FetchSettings, apply_harvest_defaults, parse_cli_with_sources, resolve_default_log_level,
    should_force_cli_log_level,
};

pub(crate) async fn run() -> Result<ProcessExit> {
    // Parse before tracing so --help prints without log noise.
    let (cli, cli_sources) = parse_cli_with_sources();
    let file_config = config::load_file_config(cli.config.as_deref())?;

    let default_level =
        resolve_default_log_level(cli.verbose, cli.quiet, &cli_sources, file_config.as_ref());
    terminal::init_tracing(&default_level, should_force_cli_log_level(&cli_sources));
    debug!(?cli, ?file_config, "CLI arguments parsed");

    match cli.command {
        Command::Harvest(args) => {
            let args = apply_harvest_defaults(args, &cli_sources, file_config.as_ref());
            let fetch = FetchSettings::resolve(&args.fetch, &cli_sources, file_config.as_ref());
            harvest::run_harvest(args, &fetch, cli.quiet).await
        }
        Command::Reconcile(args) => {
            let fetch = FetchSettings::resolve(&args.fetch, &cli_sources, file_config.as_ref());
            reconcile::run_reconcile(args, &fetch).await
        }
        Command::Process(args) => {
            let sources = file_config
                .map(|cfg| cfg.sources)
                .unwrap_or_default();
            process::run_process(args, sources).await
        }
    }
}
