//! Idempotent, retrying fetch of one URL to one local path.
//!
//! A [`Fetcher`] turns `(url, destination)` into a definite [`FetchStatus`]:
//!
//! 1. If a non-empty file already sits at the destination, return
//!    [`FetchStatus::Success`] without touching the network.
//! 2. Create the destination's parent directory.
//! 3. Attempt the GET up to `max_attempts` times with a fixed delay between
//!    attempts. A not-found response ends the loop immediately.
//!
//! Errors never escape: every failure is logged with its URL, path and
//! attempt number, and collapsed into a status.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::pool::ShutdownSignal;
use crate::status::FetchStatus;

/// Anything that can fetch a URL to a path and report a status.
///
/// [`Fetcher`] is the production implementation; the reconciler and the
/// harvest handler are generic over this trait.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches `url` to exactly `destination`.
    async fn fetch(&self, url: &str, destination: &Path) -> FetchStatus;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for &F {
    async fn fetch(&self, url: &str, destination: &Path) -> FetchStatus {
        (**self).fetch(url, destination).await
    }
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    async fn fetch(&self, url: &str, destination: &Path) -> FetchStatus {
        (**self).fetch(url, destination).await
    }
}

/// Counters for fetch outcomes, shared across concurrent callers.
#[derive(Debug, Default)]
pub struct FetchStats {
    fetched: AtomicUsize,
    skipped: AtomicUsize,
    not_found: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl FetchStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts written by this process.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }

    /// Fetches short-circuited because the artifact was already present.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Fetches that ended in [`FetchStatus::NotFound`].
    #[must_use]
    pub fn not_found(&self) -> usize {
        self.not_found.load(Ordering::SeqCst)
    }

    /// Fetches that ended in [`FetchStatus::Failed`].
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Retry attempts made across all fetches.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Total fetch calls that returned.
    #[must_use]
    pub fn total(&self) -> usize {
        self.fetched() + self.skipped() + self.not_found() + self.failed()
    }

    fn record(&self, status: FetchStatus, skipped: bool) {
        let counter = match (status, skipped) {
            (FetchStatus::Success, true) => &self.skipped,
            (FetchStatus::Success, false) => &self.fetched,
            (FetchStatus::NotFound, _) => &self.not_found,
            (FetchStatus::Failed, _) => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }
}

/// Whether `path` holds a usable artifact: an existing, non-empty regular file.
///
/// A zero-byte file is treated as absent so a crash that left an empty file
/// behind does not masquerade as a completed download.
pub async fn artifact_present(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Production [`Fetch`] implementation over [`HttpClient`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: HttpClient,
    policy: RetryPolicy,
    stats: Arc<FetchStats>,
    shutdown: Option<ShutdownSignal>,
}

impl Fetcher {
    /// Creates a fetcher with its own stats tracker.
    #[must_use]
    pub fn new(client: HttpClient, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            stats: Arc::new(FetchStats::new()),
            shutdown: None,
        }
    }

    /// Makes retry waits observe `signal`.
    ///
    /// The fetcher does not interrupt an attempt itself; once the signal fires
    /// it stops before the next attempt and reports `Failed`.
    #[must_use]
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    /// Returns the retry policy in use.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns a handle to the shared outcome counters.
    #[must_use]
    pub fn stats(&self) -> Arc<FetchStats> {
        Arc::clone(&self.stats)
    }

    fn cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(ShutdownSignal::is_triggered)
    }

    /// Sleeps for `delay`, returning `false` if shutdown fired first.
    async fn wait_before_retry(&self, delay: std::time::Duration) -> bool {
        match &self.shutdown {
            Some(signal) => {
                tokio::select! {
                    () = tokio::time::sleep(delay) => true,
                    () = signal.cancelled() => false,
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }

    async fn fetch_inner(&self, url: &str, destination: &Path) -> (FetchStatus, bool) {
        if artifact_present(destination).await {
            debug!("artifact already present, skipping");
            return (FetchStatus::Success, true);
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(error) = tokio::fs::create_dir_all(parent).await {
                warn!(
                    url,
                    path = %destination.display(),
                    error = %error,
                    "cannot create destination directory"
                );
                return (FetchStatus::Failed, false);
            }
        }

        let mut attempt = 0u32;
        loop {
            if self.cancelled() {
                info!(url, attempt, "shutdown requested, abandoning fetch");
                return (FetchStatus::Failed, false);
            }

            attempt += 1;
            debug!(attempt, "attempting fetch");

            let error = match self.client.download_to_path(url, destination).await {
                Ok(bytes) => {
                    info!(url, path = %destination.display(), bytes, attempt, "fetched");
                    return (FetchStatus::Success, false);
                }
                Err(error) => error,
            };

            let failure = classify_error(&error);
            if failure == FailureType::NotFound {
                info!(url, path = %destination.display(), attempt, error = %error, "not found");
                return (FetchStatus::NotFound, false);
            }

            match self.policy.should_retry(failure, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        url,
                        path = %destination.display(),
                        attempt = next_attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying fetch"
                    );
                    self.stats.increment_retried();
                    if !self.wait_before_retry(delay).await {
                        info!(url, attempt, "shutdown requested during retry wait");
                        return (FetchStatus::Failed, false);
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(
                        url,
                        path = %destination.display(),
                        attempt,
                        error = %error,
                        %reason,
                        "fetch failed"
                    );
                    return (FetchStatus::Failed, false);
                }
            }
        }
    }
}

#[async_trait]
impl Fetch for Fetcher {
    #[instrument(skip(self, destination), fields(url = %url, path = %destination.display()))]
    async fn fetch(&self, url: &str, destination: &Path) -> FetchStatus {
        let (status, skipped) = self.fetch_inner(url, destination).await;
        self.stats.record(status, skipped);
        status
    }
}
