//! Maps run outcomes to the process exit status.

use crate::ProcessExit;

/// Determines the exit outcome of a harvest or reconcile run.
///
/// Any unsuccessful artifact, failed task, or interruption makes the run
/// incomplete. `NotFound` artifacts do not count against it.
pub(crate) fn determine_exit_outcome(
    failed: usize,
    interrupted: bool,
    consistent: bool,
) -> ProcessExit {
    if interrupted || failed > 0 || !consistent {
        ProcessExit::Incomplete
    } else {
        ProcessExit::Success
    }
}

/// Determines the exit outcome of a harvest run.
///
/// `reconciled` carries the consistency verdict of a `--reconcile` pass. When
/// present it replaces the harvest-time fetch failures, which that pass has
/// already retried; task handler failures still count.
pub(crate) fn determine_harvest_outcome(
    fetch_failed: usize,
    task_failed: usize,
    interrupted: bool,
    reconciled: Option<bool>,
) -> ProcessExit {
    match reconciled {
        Some(consistent) => determine_exit_outcome(task_failed, interrupted, consistent),
        None => determine_exit_outcome(fetch_failed + task_failed, interrupted, true),
    }
}
