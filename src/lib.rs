//! Harvester Core Library
//!
//! Concurrent task dispatch and artifact acquisition: a bounded worker pool
//! that drains site-discovered work, a retrying idempotent fetch that turns a
//! URL into a file with a definite status, and a reconciliation pass that
//! repairs artifacts whose metadata and filesystem disagree.
//!
//! # Architecture
//!
//! - [`pool`] - Bounded worker pool with per-task failure isolation
//! - [`download`] - HTTP fetch with skip rule, fixed-delay retry and atomic writes
//! - [`metadata`] - Per-entity JSON documents and their on-disk store
//! - [`reconcile`] - Scan, repair and audit of a metadata directory
//! - [`harvest`] - Task parsing and the handler tying fetches to metadata
//! - [`process`] - Text extraction, paragraph chunking and document facts

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod harvest;
pub mod metadata;
pub mod pool;
pub mod process;
pub mod reconcile;
mod status;
mod user_agent;

// Re-export commonly used types
pub use download::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DownloadError, Fetch, FetchStats, Fetcher,
    HttpClient, RetryPolicy,
};
pub use harvest::{HarvestHandler, HarvestTask, parse_tasks};
pub use metadata::{ArtifactRecord, MetadataDocument, MetadataError, MetadataStore};
pub use pool::{DEFAULT_WORKERS, PoolError, PoolStats, ShutdownSignal, TaskHandler, WorkerPool};
pub use process::{DocumentFacts, ProcessError, ProcessReport, Processor};
pub use reconcile::{Reconciler, RepairReport, TerminalGap};
pub use status::FetchStatus;
