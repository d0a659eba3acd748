//! The `process` command: extract text and facts from harvested files.

use std::path::Path;

use anyhow::{Context, Result, bail};
use harvester_core::Processor;
use harvester_core::process::ProcessedFile;
use tracing::info;

use super::exit;
use crate::ProcessExit;
use crate::cli::ProcessArgs;

pub(crate) async fn run_process(
    args: ProcessArgs,
    sources: Vec<(String, String)>,
) -> Result<ProcessExit> {
    if !args.dir.is_dir() {
        bail!("Directory '{}' does not exist", args.dir.display());
    }

    let processor = sources
        .into_iter()
        .fold(Processor::new(), |processor, (segment, label)| {
            processor.with_source(segment, label)
        });
    let dir = args.dir.clone();
    let report = tokio::task::spawn_blocking(move || processor.process_dir(&dir))
        .await
        .context("Text processing task panicked")?
        .with_context(|| format!("Failed to process '{}'", args.dir.display()))?;

    if let Some(manifest) = &args.manifest {
        write_manifest(manifest, &report.processed).await?;
        info!(path = %manifest.display(), files = report.processed.len(), "Wrote manifest");
    }

    println!("{report}");
    Ok(exit::determine_exit_outcome(report.unreadable.len(), false, true))
}

async fn write_manifest(path: &Path, files: &[ProcessedFile]) -> Result<()> {
    let json = serde_json::to_vec_pretty(files).context("Failed to serialize manifest")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write manifest '{}'", path.display()))
}
