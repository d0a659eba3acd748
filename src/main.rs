//! CLI entry point for harvester.

use std::process::ExitCode;

mod app;
mod cli;

/// How the process should exit when no error escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every task finished and nothing is left to repair.
    Success,
    /// Some artifacts failed, gaps remain, or the run was interrupted.
    Incomplete,
}

impl From<ProcessExit> for ExitCode {
    fn from(outcome: ProcessExit) -> Self {
        match outcome {
            ProcessExit::Success => Self::SUCCESS,
            ProcessExit::Incomplete => Self::from(2_u8),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::run().await {
        Ok(outcome) => outcome.into(),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
