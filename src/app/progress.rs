//! Progress UI (spinner) for harvest runs.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use harvester_core::WorkerPool;
use indicatif::{ProgressBar, ProgressStyle};

/// Spawns the spinner when requested.
///
/// Returns `(handle, stop)`; set `stop` and await the handle to clear it.
/// When `use_spinner` is false the handle is `None` and `stop` is already set.
pub(crate) fn spawn_progress_ui<T: Debug + Send + 'static>(
    use_spinner: bool,
    pool: Arc<WorkerPool<T>>,
    total: usize,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(pool, total, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_spinner_inner<T: Debug + Send + 'static>(
    pool: Arc<WorkerPool<T>>,
    total: usize,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            let stats = pool.stats();
            spinner.set_message(format!(
                "[{}/{}] Harvesting ({} failed)...",
                stats.processed().min(total),
                total,
                stats.failed
            ));
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    })
}
