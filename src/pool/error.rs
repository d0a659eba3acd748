//! Error types for worker pool construction and task submission.

use thiserror::Error;

/// Minimum number of workers a pool may run.
pub const MIN_WORKERS: usize = 1;

/// Maximum number of workers a pool may run.
pub const MAX_WORKERS: usize = 100;

/// Errors returned by [`WorkerPool`](super::WorkerPool) operations.
///
/// Task failures are not represented here: a failing handler is logged and
/// counted, never surfaced to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Invalid worker count provided at construction.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The pool has been stopped and accepts no further work.
    #[error("worker pool '{name}' is stopped")]
    Stopped {
        /// Diagnostic name of the pool.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_error_display() {
        assert_eq!(
            PoolError::InvalidWorkerCount { value: 0 }.to_string(),
            "invalid worker count 0: must be between 1 and 100"
        );
        assert_eq!(
            PoolError::Stopped {
                name: "press".to_string()
            }
            .to_string(),
            "worker pool 'press' is stopped"
        );
    }
}
