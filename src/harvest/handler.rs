//! The task handler that fetches artifacts and records their metadata.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::task::{ArtifactTask, DocumentTask, HarvestTask};
use crate::download::{Fetch, filename_from_url, sanitize_filename};
use crate::metadata::{AggregateDocument, ArtifactRecord, MetadataDocument, MetadataStore};
use crate::pool::TaskHandler;
use crate::status::FetchStatus;

/// Fetches each task's artifacts into one directory and writes a metadata
/// document beside them.
///
/// - [`ArtifactTask`]: `<dir>/<file>` plus singleton `<dir>/<file stem>.json`
/// - [`DocumentTask`]: each attachment as `<dir>/<file>` plus aggregate
///   `<dir>/<id>.json`
#[derive(Debug)]
pub struct HarvestHandler<F> {
    fetcher: F,
    output_dir: PathBuf,
    store: MetadataStore,
}

impl<F: Fetch> HarvestHandler<F> {
    /// Creates a handler writing artifacts and metadata into `output_dir`.
    pub fn new(fetcher: F, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            fetcher,
            store: MetadataStore::new(&output_dir),
            output_dir,
        }
    }

    /// Processes one task end to end.
    ///
    /// Fetch failures are recorded in the metadata, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error only if the metadata document cannot be written.
    pub async fn process(&self, task: HarvestTask) -> anyhow::Result<PathBuf> {
        match task {
            HarvestTask::Artifact(artifact) => self.process_artifact(artifact).await,
            HarvestTask::Document(document) => self.process_document(document).await,
        }
    }

    #[instrument(skip_all, fields(url = %task.url))]
    async fn process_artifact(&self, task: ArtifactTask) -> anyhow::Result<PathBuf> {
        let filename = filename_from_url(&task.url)
            .or_else(|| task.title.as_deref().map(sanitize_filename))
            .unwrap_or_else(|| "artifact".to_string());
        let local_path = self.output_dir.join(&filename);

        let status = self.fetcher.fetch(&task.url, &local_path).await;

        let mut record = ArtifactRecord::new(task.title, task.url, local_path, status);
        if let Some(date) = task.date {
            record = record.with_field("date", clean_date(&date));
        }
        for (key, value) in task.extra {
            record.extra.entry(key).or_insert(value);
        }

        let identifier = Path::new(&filename)
            .file_stem()
            .map_or_else(|| filename.clone(), |stem| stem.to_string_lossy().into_owned());
        let document = MetadataDocument::Singleton(record);
        let metadata_path = self
            .store
            .save(&identifier, &document)
            .await
            .with_context(|| format!("failed to save metadata for {filename}"))?;

        log_saved(&metadata_path, &[status]);
        Ok(metadata_path)
    }

    #[instrument(skip_all, fields(id = %task.id))]
    async fn process_document(&self, task: DocumentTask) -> anyhow::Result<PathBuf> {
        let stem = sanitize_filename(&task.id.replace('/', "_"));
        let mut records = Vec::with_capacity(task.documents.len());

        for (index, link) in task.documents.into_iter().enumerate() {
            let filename =
                filename_from_url(&link.url).unwrap_or_else(|| format!("{stem}-{}", index + 1));
            let local_path = self.output_dir.join(filename);
            let status = self.fetcher.fetch(&link.url, &local_path).await;
            records.push(ArtifactRecord::new(link.title, link.url, local_path, status));
        }
        let statuses: Vec<FetchStatus> = records.iter().map(|r| r.download_status).collect();

        let mut fields = task.extra;
        fields.insert("id".to_string(), Value::String(task.id.clone()));
        if let Some(title) = task.title {
            fields.insert("title".to_string(), Value::String(title));
        }
        let document = MetadataDocument::Aggregate(AggregateDocument {
            documents: records,
            fields,
        });

        let metadata_path = self
            .store
            .save(&task.id, &document)
            .await
            .with_context(|| format!("failed to save metadata for {}", task.id))?;

        log_saved(&metadata_path, &statuses);
        Ok(metadata_path)
    }
}

#[async_trait]
impl<F: Fetch + 'static> TaskHandler<HarvestTask> for HarvestHandler<F> {
    async fn handle(&self, task: HarvestTask) -> anyhow::Result<()> {
        self.process(task).await.map(|_| ())
    }
}

/// Strips dash separators and surrounding whitespace from a displayed date.
fn clean_date(date: &str) -> String {
    date.replace(['–', '—'], "").trim().to_string()
}

fn log_saved(metadata_path: &Path, statuses: &[FetchStatus]) {
    let failed = statuses.iter().filter(|s| **s != FetchStatus::Success).count();
    if failed == 0 {
        info!(metadata = %metadata_path.display(), artifacts = statuses.len(), "saved metadata");
    } else {
        warn!(
            metadata = %metadata_path.display(),
            artifacts = statuses.len(),
            unsuccessful = failed,
            "saved metadata with unsuccessful downloads"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::harvest::DocumentLink;

    /// Succeeds for every URL except those ending in `missing.pdf`.
    #[derive(Default)]
    struct StubFetcher {
        calls: Mutex<Vec<(String, PathBuf)>>,
    }

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn fetch(&self, url: &str, destination: &Path) -> FetchStatus {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), destination.to_path_buf()));
            if url.ends_with("missing.pdf") {
                return FetchStatus::NotFound;
            }
            std::fs::write(destination, b"pdf").unwrap();
            FetchStatus::Success
        }
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_artifact_task_writes_singleton_beside_file() {
        let temp_dir = TempDir::new().unwrap();
        let handler = HarvestHandler::new(StubFetcher::default(), temp_dir.path());
        let task: HarvestTask = serde_json::from_value(json!({
            "url": "https://example.com/uploads/2022/05/1-5.pdf",
            "title": "Council approves budget",
            "date": "– May 3, 2022 "
        }))
        .unwrap();

        let metadata_path = handler.process(task).await.unwrap();

        assert_eq!(metadata_path, temp_dir.path().join("1-5.json"));
        assert!(temp_dir.path().join("1-5.pdf").exists());
        let value = read_json(&metadata_path);
        assert_eq!(value["title"], "Council approves budget");
        assert_eq!(value["date"], "May 3, 2022");
        assert_eq!(value["download_status"], "Success");
        assert_eq!(
            value["local_path"],
            json!(temp_dir.path().join("1-5.pdf"))
        );
    }

    #[tokio::test]
    async fn test_document_task_writes_aggregate_with_each_status() {
        let temp_dir = TempDir::new().unwrap();
        let handler = HarvestHandler::new(StubFetcher::default(), temp_dir.path());
        let task = HarvestTask::Document(DocumentTask {
            id: "0123/22".to_string(),
            title: Some("An Act".to_string()),
            documents: vec![
                DocumentLink {
                    title: Some("Bill".to_string()),
                    url: "https://example.com/bill.pdf".to_string(),
                },
                DocumentLink {
                    title: Some("Memo".to_string()),
                    url: "https://example.com/missing.pdf".to_string(),
                },
            ],
            extra: serde_json::Map::new(),
        });

        let metadata_path = handler.process(task).await.unwrap();

        assert_eq!(metadata_path, temp_dir.path().join("0123_22.json"));
        let value = read_json(&metadata_path);
        assert_eq!(value["id"], "0123/22");
        assert_eq!(value["documents"][0]["download_status"], "Success");
        assert_eq!(value["documents"][1]["download_status"], "Not Found");
        assert_eq!(value["documents"][1]["title"], "Memo");
    }

    #[tokio::test]
    async fn test_url_without_filename_falls_back_to_title() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::default();
        let handler = HarvestHandler::new(&fetcher, temp_dir.path());
        let task: HarvestTask = serde_json::from_value(json!({
            "url": "https://example.com/press/",
            "title": "Weekly: update"
        }))
        .unwrap();

        handler.process(task).await.unwrap();

        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(calls[0].1, temp_dir.path().join("Weekly_ update"));
    }

    #[test]
    fn test_clean_date_strips_dashes() {
        assert_eq!(clean_date(" – June 1, 2022"), "June 1, 2022");
        assert_eq!(clean_date("June 1, 2022"), "June 1, 2022");
    }
}
