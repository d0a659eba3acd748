//! Artifact acquisition: one URL to one local file with a definite status.
//!
//! # Features
//!
//! - Streaming downloads into a `.part` sibling, renamed into place when complete
//! - Skip rule: a non-empty file already at the destination is trusted as-is
//! - Fixed-delay retry for transient failures, no retry for 404/410
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use harvester_core::download::{Fetch, Fetcher, HttpClient, RetryPolicy};
//! use harvester_core::FetchStatus;
//!
//! # async fn example() {
//! let fetcher = Fetcher::new(HttpClient::new(), RetryPolicy::default());
//! let status = fetcher
//!     .fetch("https://example.com/report.pdf", Path::new("./press/report.pdf"))
//!     .await;
//! assert_ne!(status, FetchStatus::Failed);
//! # }
//! ```

mod client;
mod constants;
mod error;
mod fetcher;
mod filename;
mod retry;

pub use client::HttpClient;
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, READ_TIMEOUT_SECS,
};
pub use error::DownloadError;
pub use fetcher::{Fetch, FetchStats, Fetcher, artifact_present};
pub use filename::{filename_from_url, sanitize_filename};
pub(crate) use filename::partial_path;
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
