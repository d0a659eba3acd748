//! The `harvest` command: fetch every input task through the worker pool.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use harvester_core::pool::shutdown_channel;
use harvester_core::{HarvestHandler, Reconciler, WorkerPool, parse_tasks};
use tracing::{debug, info, warn};

use super::config_runtime::FetchSettings;
use super::{exit, progress, terminal};
use crate::ProcessExit;
use crate::cli::HarvestArgs;

pub(crate) async fn run_harvest(
    args: HarvestArgs,
    fetch: &FetchSettings,
    quiet: bool,
) -> Result<ProcessExit> {
    let Some(input_text) = read_input(&args.inputs)? else {
        info!("No input provided. Pass URLs or JSON task lines as arguments or via stdin.");
        info!("Example: echo 'https://example.com/file.pdf' | harvester harvest -o out");
        return Ok(ProcessExit::Success);
    };

    let parsed = parse_tasks(&input_text);
    for rejected in &parsed.rejected {
        warn!(error = %rejected, "Skipped input");
    }
    if parsed.tasks.is_empty() {
        info!("No valid tasks found in input");
        return Ok(ProcessExit::Success);
    }

    let output_dir = prepare_output_dir(args.output_dir.unwrap_or_else(|| PathBuf::from(".")))
        .await?;
    let total_tasks = parsed.tasks.len();
    let total_artifacts: usize = parsed.tasks.iter().map(|task| task.artifact_count()).sum();
    info!(
        tasks = total_tasks,
        artifacts = total_artifacts,
        skipped = parsed.rejected.len(),
        output_dir = %output_dir.display(),
        "Parsed input"
    );

    let (trigger, signal) = shutdown_channel();
    let fetcher = fetch.build_fetcher()?.with_shutdown(signal.clone());
    let fetch_stats = fetcher.stats();
    let handler = HarvestHandler::new(fetcher, &output_dir);
    let pool = Arc::new(WorkerPool::new(
        "harvest",
        usize::from(args.workers),
        handler,
    )?);

    pool.start();
    for task in parsed.tasks {
        pool.enqueue(task)?;
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_watcher = {
        let interrupted = Arc::clone(&interrupted);
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling in-flight tasks");
                interrupted.store(true, Ordering::SeqCst);
                trigger.trigger();
                pool.stop().await;
            }
        })
    };

    let use_spinner =
        terminal::should_use_spinner(io::stderr().is_terminal(), quiet, terminal::is_dumb_terminal());
    let (progress_handle, progress_stop) =
        progress::spawn_progress_ui(use_spinner, Arc::clone(&pool), total_tasks);

    pool.join().await;
    pool.stop().await;

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    let pool_stats = pool.stats();
    info!(
        fetched = fetch_stats.fetched(),
        skipped = fetch_stats.skipped(),
        not_found = fetch_stats.not_found(),
        failed = fetch_stats.failed(),
        retried = fetch_stats.retried(),
        task_errors = pool_stats.failed,
        cancelled = pool_stats.cancelled,
        "Harvest complete"
    );

    if interrupted.load(Ordering::SeqCst) {
        interrupt_watcher.abort();
        warn!(
            unprocessed = total_tasks.saturating_sub(pool_stats.processed()),
            "Harvest interrupted"
        );
        return Ok(ProcessExit::Incomplete);
    }

    let mut reconciled = None;
    if args.reconcile {
        let reconciler = Reconciler::new(fetch.build_fetcher()?.with_shutdown(signal));
        let report = reconciler
            .reconcile(&output_dir)
            .await
            .with_context(|| format!("Failed to reconcile '{}'", output_dir.display()));
        interrupt_watcher.abort();
        let report = report?;
        println!("{report}");
        reconciled = Some(report.is_consistent());
    } else {
        interrupt_watcher.abort();
    }

    Ok(exit::determine_harvest_outcome(
        fetch_stats.failed(),
        pool_stats.failed,
        interrupted.load(Ordering::SeqCst),
        reconciled,
    ))
}

/// Joins positional inputs, or reads piped stdin when there are none.
fn read_input(inputs: &[String]) -> Result<Option<String>> {
    if !inputs.is_empty() {
        return Ok(Some(inputs.join("\n")));
    }
    if io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read stdin")?;
    debug!(bytes = buffer.len(), "Read input from stdin");
    if buffer.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(buffer))
    }
}

/// Creates `dir` and returns its absolute form so recorded paths survive a
/// change of working directory.
async fn prepare_output_dir(dir: PathBuf) -> Result<PathBuf> {
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
    tokio::fs::canonicalize(&dir)
        .await
        .with_context(|| format!("Failed to resolve output directory '{}'", dir.display()))
}
