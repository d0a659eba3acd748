//! Post-run repair of artifacts whose metadata and filesystem disagree.
//!
//! A pass has three phases:
//!
//! 1. **Scan** every document in a metadata directory and select records that
//!    are `Failed`, or whose file is missing or empty (unless `Not Found`).
//! 2. **Repair** each selected record by fetching its exact `(url, path)`
//!    pair again, then write the new statuses back into its document.
//! 3. **Audit** by scanning again and listing every record that still has no
//!    artifact on disk.
//!
//! Nothing here aborts on a bad document or a failed fetch; problems are
//! logged and collected in the [`RepairReport`].

mod report;

use std::path::{Path, PathBuf};

use tracing::{error, info, instrument, warn};

use crate::download::{Fetch, artifact_present};
use crate::metadata::{ArtifactRecord, MetadataError, MetadataStore};
use crate::status::FetchStatus;

pub use report::{DocumentIssue, RecordRef, RepairReport, TerminalGap};

/// A record selected for repair during the scan phase.
#[derive(Debug)]
struct Candidate {
    record: RecordRef,
    local_path: Option<PathBuf>,
}

/// Result of a repair fetch, to be written back into its document.
#[derive(Debug)]
struct Outcome {
    index: usize,
    url: String,
    status: FetchStatus,
}

/// Re-fetches incomplete artifacts recorded in a metadata directory.
#[derive(Debug)]
pub struct Reconciler<F> {
    fetcher: F,
}

impl<F: Fetch> Reconciler<F> {
    /// Creates a reconciler that repairs through `fetcher`.
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Runs scan, repair and audit over `metadata_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Io`] only if the directory itself cannot be
    /// listed. Per-document problems are reported, not returned.
    #[instrument(skip(self, metadata_dir), fields(dir = %metadata_dir.display()))]
    pub async fn reconcile(&self, metadata_dir: &Path) -> Result<RepairReport, MetadataError> {
        let store = MetadataStore::new(metadata_dir);
        let mut report = RepairReport::default();

        let documents = store.scan().await?;
        let mut pending: Vec<(PathBuf, Vec<Candidate>)> = Vec::new();

        for path in documents {
            let document = match store.load(&path).await {
                Ok(document) => document,
                Err(e) => {
                    error!(document = %path.display(), error = %e, "skipping unreadable metadata document");
                    report.unreadable.push(DocumentIssue {
                        document: path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            report.documents_scanned += 1;

            let mut candidates = Vec::new();
            for (index, record) in document.records().iter().enumerate() {
                report.records_checked += 1;
                if needs_repair(record).await {
                    candidates.push(Candidate {
                        record: record_ref(&path, index, record),
                        local_path: record.local_path.clone(),
                    });
                }
            }
            if !candidates.is_empty() {
                report.candidates += candidates.len();
                pending.push((path, candidates));
            }
        }

        info!(
            documents = report.documents_scanned,
            records = report.records_checked,
            candidates = report.candidates,
            "scan complete"
        );

        for (path, candidates) in pending {
            let outcomes = self.repair_document(candidates, &mut report).await;
            if outcomes.is_empty() {
                continue;
            }
            if let Err(e) = apply_outcomes(&store, &path, &outcomes).await {
                error!(document = %path.display(), error = %e, "cannot write repaired statuses");
                report.unwritable.push(DocumentIssue {
                    document: path,
                    reason: e.to_string(),
                });
            }
        }

        report.terminal_gaps = audit(&store).await;
        for gap in &report.terminal_gaps {
            warn!(
                document = %gap.record.document.display(),
                url = gap.record.url.as_deref().unwrap_or("<none>"),
                path = %gap.local_path.as_ref().map(|p| p.display().to_string()).unwrap_or_default(),
                status = %gap.status,
                "terminal gap"
            );
        }

        info!(
            repaired = report.repaired.len(),
            still_failed = report.still_failed.len(),
            unrepairable = report.unrepairable.len(),
            terminal_gaps = report.terminal_gaps.len(),
            "reconciliation complete"
        );
        Ok(report)
    }

    async fn repair_document(
        &self,
        candidates: Vec<Candidate>,
        report: &mut RepairReport,
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        for candidate in candidates {
            let (Some(url), Some(local_path)) =
                (candidate.record.url.clone(), candidate.local_path.as_deref())
            else {
                warn!(
                    document = %candidate.record.document.display(),
                    index = candidate.record.index,
                    has_url = candidate.record.url.is_some(),
                    has_path = candidate.local_path.is_some(),
                    "record lacks url or local path, cannot repair"
                );
                report.unrepairable.push(candidate.record);
                continue;
            };

            let status = self.fetcher.fetch(&url, local_path).await;
            info!(url = %url, path = %local_path.display(), %status, "repair attempted");
            if status == FetchStatus::Success {
                report.repaired.push(candidate.record.clone());
            } else {
                report.still_failed.push((candidate.record.clone(), status));
            }
            outcomes.push(Outcome {
                index: candidate.record.index,
                url,
                status,
            });
        }
        outcomes
    }
}

async fn needs_repair(record: &ArtifactRecord) -> bool {
    match record.download_status {
        FetchStatus::NotFound => false,
        FetchStatus::Failed => true,
        FetchStatus::Success => match &record.local_path {
            Some(path) => !artifact_present(path).await,
            None => true,
        },
    }
}

fn record_ref(document: &Path, index: usize, record: &ArtifactRecord) -> RecordRef {
    RecordRef {
        document: document.to_path_buf(),
        index,
        title: record.title.clone(),
        url: record.url.clone(),
    }
}

/// Re-reads the document and rewrites only the statuses that changed.
async fn apply_outcomes(
    store: &MetadataStore,
    path: &Path,
    outcomes: &[Outcome],
) -> Result<(), MetadataError> {
    let mut document = store.load(path).await?;
    let mut changed = false;

    for outcome in outcomes {
        match document.records_mut().get_mut(outcome.index) {
            Some(record) if record.url.as_deref() == Some(outcome.url.as_str()) => {
                if record.download_status != outcome.status {
                    record.download_status = outcome.status;
                    changed = true;
                }
            }
            _ => warn!(
                document = %path.display(),
                index = outcome.index,
                url = %outcome.url,
                "record changed on disk during repair, leaving it untouched"
            ),
        }
    }

    if changed {
        store.write(path, &document).await?;
    }
    Ok(())
}

async fn audit(store: &MetadataStore) -> Vec<TerminalGap> {
    let documents = match store.scan().await {
        Ok(documents) => documents,
        Err(e) => {
            error!(error = %e, "audit could not list metadata directory");
            return Vec::new();
        }
    };

    let mut gaps = Vec::new();
    for path in documents {
        let Ok(document) = store.load(&path).await else {
            continue;
        };
        for (index, record) in document.records().iter().enumerate() {
            let present = match &record.local_path {
                Some(local_path) => artifact_present(local_path).await,
                None => false,
            };
            if !present {
                gaps.push(TerminalGap {
                    record: record_ref(&path, index, record),
                    local_path: record.local_path.clone(),
                    status: record.download_status,
                });
            }
        }
    }
    gaps
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    /// Writes a fixed body for every URL not listed as missing.
    #[derive(Default)]
    struct FakeFetcher {
        missing: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetch for FakeFetcher {
        async fn fetch(&self, url: &str, destination: &Path) -> FetchStatus {
            self.calls.lock().unwrap().push(url.to_string());
            if self.missing.iter().any(|m| m == url) {
                return FetchStatus::NotFound;
            }
            std::fs::write(destination, b"repaired").unwrap();
            FetchStatus::Success
        }
    }

    fn write_json(path: &Path, value: &serde_json::Value) {
        std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    }

    fn status_of(path: &Path, index: usize) -> String {
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        let record = value
            .get("documents")
            .map_or(&value, |docs| &docs[index]);
        record["download_status"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_not_found_record_is_never_selected() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("gone.json");
        write_json(
            &doc,
            &json!({
                "title": "Gone",
                "url": "https://example.com/gone.pdf",
                "local_path": temp_dir.path().join("gone.pdf"),
                "download_status": "Not Found"
            }),
        );

        let fetcher = FakeFetcher::default();
        let report = Reconciler::new(&fetcher).reconcile(temp_dir.path()).await.unwrap();

        assert_eq!(report.candidates, 0);
        assert!(fetcher.calls.lock().unwrap().is_empty());
        assert_eq!(report.terminal_gaps.len(), 1);
        assert!(report.is_consistent());
    }

    #[tokio::test]
    async fn test_success_with_deleted_file_is_refetched() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("a.pdf");
        let doc = temp_dir.path().join("bill.json");
        write_json(
            &doc,
            &json!({
                "legislation_number": "0001-22",
                "documents": [
                    {"title": "A", "url": "https://example.com/a.pdf",
                     "local_path": artifact, "download_status": "Success"}
                ]
            }),
        );

        let fetcher = FakeFetcher::default();
        let report = Reconciler::new(&fetcher).reconcile(temp_dir.path()).await.unwrap();

        assert_eq!(report.repaired.len(), 1);
        assert_eq!(std::fs::read(&artifact).unwrap(), b"repaired");
        assert_eq!(status_of(&doc, 0), "Success");
        assert!(report.terminal_gaps.is_empty());
    }

    #[tokio::test]
    async fn test_repair_to_not_found_updates_status() {
        let temp_dir = TempDir::new().unwrap();
        let doc = temp_dir.path().join("memo.json");
        write_json(
            &doc,
            &json!({
                "url": "https://example.com/memo.pdf",
                "local_path": temp_dir.path().join("memo.pdf"),
                "download_status": "Failed"
            }),
        );

        let fetcher = FakeFetcher {
            missing: vec!["https://example.com/memo.pdf".to_string()],
            ..FakeFetcher::default()
        };
        let reconciler = Reconciler::new(&fetcher);

        let first = reconciler.reconcile(temp_dir.path()).await.unwrap();
        assert_eq!(first.still_failed.len(), 1);
        assert_eq!(status_of(&doc, 0), "Not Found");

        let second = reconciler.reconcile(temp_dir.path()).await.unwrap();
        assert_eq!(second.repairs_attempted(), 0);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_records_without_url_or_path_are_unrepairable() {
        let temp_dir = TempDir::new().unwrap();
        write_json(
            &temp_dir.path().join("partial.json"),
            &json!({
                "id": "x",
                "documents": [
                    {"title": "no url", "url": null,
                     "local_path": temp_dir.path().join("x.pdf"), "download_status": "Failed"},
                    {"title": "no path", "url": "https://example.com/y.pdf",
                     "local_path": null, "download_status": "Failed"}
                ]
            }),
        );

        let fetcher = FakeFetcher::default();
        let report = Reconciler::new(&fetcher).reconcile(temp_dir.path()).await.unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.unrepairable.len(), 2);
        assert_eq!(report.repairs_attempted(), 0);
        assert_eq!(report.terminal_gaps.len(), 2);
        assert!(!report.is_consistent());
    }

    #[tokio::test]
    async fn test_malformed_document_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("bad.json"), b"{ truncated").unwrap();
        let artifact = temp_dir.path().join("ok.pdf");
        write_json(
            &temp_dir.path().join("ok.json"),
            &json!({
                "url": "https://example.com/ok.pdf",
                "local_path": artifact,
                "download_status": "Failed"
            }),
        );

        let fetcher = FakeFetcher::default();
        let report = Reconciler::new(&fetcher).reconcile(temp_dir.path()).await.unwrap();

        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(report.documents_scanned, 1);
        assert_eq!(report.repaired.len(), 1);
        assert!(artifact.exists());
    }
}
