//! The `reconcile` command: repair gaps between metadata and the filesystem.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use harvester_core::Reconciler;
use harvester_core::pool::shutdown_channel;
use tracing::{info, warn};

use super::config_runtime::FetchSettings;
use super::exit;
use crate::ProcessExit;
use crate::cli::ReconcileArgs;

pub(crate) async fn run_reconcile(args: ReconcileArgs, fetch: &FetchSettings) -> Result<ProcessExit> {
    if !args.dir.is_dir() {
        bail!("Metadata directory '{}' does not exist", args.dir.display());
    }

    let (trigger, signal) = shutdown_channel();
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_watcher = {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, abandoning remaining repairs");
                interrupted.store(true, Ordering::SeqCst);
                trigger.trigger();
            }
        })
    };

    let fetcher = fetch.build_fetcher()?.with_shutdown(signal);
    let reconciler = Reconciler::new(fetcher);
    let report = reconciler
        .reconcile(&args.dir)
        .await
        .with_context(|| format!("Failed to reconcile '{}'", args.dir.display()));
    interrupt_watcher.abort();
    let report = report?;

    info!(
        documents = report.documents_scanned,
        repaired = report.repaired.len(),
        still_failed = report.still_failed.len(),
        "Reconciliation complete"
    );
    println!("{report}");

    Ok(exit::determine_exit_outcome(
        0,
        interrupted.load(Ordering::SeqCst),
        report.is_consistent(),
    ))
}
