//! Merges CLI arguments with file configuration.
//!
//! Precedence: values typed on the command line, then the config file, then
//! clap defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use harvester_core::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use harvester_core::{Fetcher, HttpClient, RetryPolicy};

use super::config::FileConfig;
use crate::cli::{Cli, FetchArgs, HarvestArgs};

/// Which arguments were typed explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CliValueSources {
    pub(crate) output_dir: bool,
    pub(crate) workers: bool,
    pub(crate) max_retries: bool,
    pub(crate) retry_delay: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Cli, CliValueSources) {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sub = matches.subcommand().map(|(_, sub)| sub);
    let is_harvest = matches!(matches.subcommand_name(), Some("harvest"));

    let sources = CliValueSources {
        output_dir: is_harvest && is_commandline_value(sub, "output_dir"),
        workers: is_harvest && is_commandline_value(sub, "workers"),
        max_retries: is_commandline_value(sub, "max_retries"),
        retry_delay: is_commandline_value(sub, "retry_delay"),
        verbose: is_commandline_value(Some(&matches), "verbose")
            || is_commandline_value(sub, "verbose"),
        quiet: is_commandline_value(Some(&matches), "quiet")
            || is_commandline_value(sub, "quiet"),
    };
    (cli, sources)
}

fn is_commandline_value(matches: Option<&ArgMatches>, id: &str) -> bool {
    matches.is_some_and(|m| {
        m.try_contains_id(id).is_ok() && m.value_source(id) == Some(ValueSource::CommandLine)
    })
}

/// Fills harvest options the command line left unset from the config file.
pub(crate) fn apply_harvest_defaults(
    mut args: HarvestArgs,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> HarvestArgs {
    if let Some(file_config) = file_config {
        if !cli_sources.output_dir
            && args.output_dir.is_none()
            && let Some(output_dir) = &file_config.output_dir
        {
            args.output_dir = Some(output_dir.clone());
        }
        if !cli_sources.workers
            && let Some(workers) = file_config.workers
        {
            args.workers = workers;
        }
    }
    if args.output_dir.is_none() {
        args.output_dir = Some(PathBuf::from("."));
    }
    args
}

/// Resolved fetch tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchSettings {
    pub(crate) max_attempts: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) connect_timeout_secs: u64,
    pub(crate) read_timeout_secs: u64,
}

impl FetchSettings {
    pub(crate) fn resolve(
        args: &FetchArgs,
        cli_sources: &CliValueSources,
        file_config: Option<&FileConfig>,
    ) -> Self {
        let file = file_config.cloned().unwrap_or_default();
        let max_retries = if cli_sources.max_retries {
            args.max_retries
        } else {
            file.max_retries.unwrap_or(args.max_retries)
        };
        let retry_delay = if cli_sources.retry_delay {
            args.retry_delay
        } else {
            file.retry_delay_secs.unwrap_or(args.retry_delay)
        };
        Self {
            max_attempts: u32::from(max_retries),
            retry_delay: Duration::from_secs(retry_delay),
            connect_timeout_secs: file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
            read_timeout_secs: file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
        }
    }

    pub(crate) fn build_fetcher(&self) -> Result<Fetcher> {
        let client =
            HttpClient::try_new_with_timeouts(self.connect_timeout_secs, self.read_timeout_secs)
                .context("Failed to build HTTP client")?;
        Ok(Fetcher::new(
            client,
            RetryPolicy::new(self.max_attempts, self.retry_delay),
        ))
    }
}

pub(crate) fn resolve_default_log_level(
    verbose: u8,
    quiet: bool,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> String {
    if !should_force_cli_log_level(cli_sources)
        && let Some(level) = file_config.and_then(|cfg| cfg.log_level.as_ref())
    {
        return level.clone();
    }
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    level.to_string()
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_args(max_retries: u8, retry_delay: u64) -> FetchArgs {
        FetchArgs {
            max_retries,
            retry_delay,
        }
    }

    fn file_config() -> FileConfig {
        FileConfig {
            output_dir: Some(PathBuf::from("/data/press")),
            workers: Some(4),
            max_retries: Some(6),
            retry_delay_secs: Some(1),
            connect_timeout_secs: Some(5),
            read_timeout_secs: None,
            log_level: Some("warn".to_string()),
            sources: Vec::new(),
        }
    }

    fn harvest_args() -> HarvestArgs {
        HarvestArgs {
            inputs: Vec::new(),
            output_dir: None,
            workers: 10,
            fetch: fetch_args(3, 5),
            reconcile: false,
        }
    }

    #[test]
    fn test_file_values_fill_unset_cli_values() {
        let cfg = file_config();
        let sources = CliValueSources::default();

        let args = apply_harvest_defaults(harvest_args(), &sources, Some(&cfg));
        let fetch = FetchSettings::resolve(&args.fetch, &sources, Some(&cfg));

        assert_eq!(args.output_dir, Some(PathBuf::from("/data/press")));
        assert_eq!(args.workers, 4);
        assert_eq!(fetch.max_attempts, 6);
        assert_eq!(fetch.retry_delay, Duration::from_secs(1));
        assert_eq!(fetch.connect_timeout_secs, 5);
        assert_eq!(fetch.read_timeout_secs, READ_TIMEOUT_SECS);
    }

    #[test]
    fn test_command_line_values_win_over_file() {
        let cfg = file_config();
        let sources = CliValueSources {
            output_dir: true,
            workers: true,
            max_retries: true,
            retry_delay: true,
            ..CliValueSources::default()
        };
        let mut args = harvest_args();
        args.output_dir = Some(PathBuf::from("out"));
        args.workers = 2;

        let args = apply_harvest_defaults(args, &sources, Some(&cfg));
        let fetch = FetchSettings::resolve(&fetch_args(3, 0), &sources, Some(&cfg));

        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.workers, 2);
        assert_eq!(fetch.max_attempts, 3);
        assert_eq!(fetch.retry_delay, Duration::ZERO);
    }

    #[test]
    fn test_output_dir_defaults_to_current_directory() {
        let args = apply_harvest_defaults(harvest_args(), &CliValueSources::default(), None);
        assert_eq!(args.output_dir, Some(PathBuf::from(".")));
    }

    #[test]
    fn test_log_level_precedence() {
        let cfg = file_config();
        let none = CliValueSources::default();
        assert_eq!(resolve_default_log_level(0, false, &none, Some(&cfg)), "warn");
        assert_eq!(resolve_default_log_level(0, false, &none, None), "info");

        let verbose = CliValueSources {
            verbose: true,
            ..CliValueSources::default()
        };
        assert_eq!(resolve_default_log_level(1, false, &verbose, Some(&cfg)), "debug");
        assert_eq!(resolve_default_log_level(2, false, &verbose, None), "trace");

        let quiet = CliValueSources {
            quiet: true,
            ..CliValueSources::default()
        };
        assert_eq!(resolve_default_log_level(0, true, &quiet, Some(&cfg)), "error");
    }
}
