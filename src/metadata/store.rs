//! Directory-backed store of metadata documents, one JSON file per entity.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use super::error::MetadataError;
use super::record::MetadataDocument;
use crate::download::{partial_path, sanitize_filename};

/// Extension of metadata document files.
pub const METADATA_EXTENSION: &str = "json";

/// Metadata documents living in one directory.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    /// Creates a store rooted at `dir`. Nothing is touched on disk.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the documents.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic document path for an entity identifier.
    ///
    /// Slashes become `_` and other unsafe characters are sanitized, so
    /// `"0123/22"` maps to `<dir>/0123_22.json` on every run.
    #[must_use]
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        let stem = sanitize_filename(&identifier.replace('/', "_"));
        self.dir.join(format!("{stem}.{METADATA_EXTENSION}"))
    }

    /// Reads and parses one document.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Io`] if the file cannot be read and
    /// [`MetadataError::Parse`] if it is not a valid document.
    pub async fn load(&self, path: &Path) -> Result<MetadataDocument, MetadataError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| MetadataError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| MetadataError::parse(path, e))
    }

    /// Writes `document` to `path` atomically (temp file, then rename).
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] if serialization or any filesystem step fails.
    #[instrument(skip(self, document), fields(path = %path.display()))]
    pub async fn write(&self, path: &Path, document: &MetadataDocument) -> Result<(), MetadataError> {
        let mut bytes =
            serde_json::to_vec_pretty(document).map_err(|e| MetadataError::serialize(path, e))?;
        bytes.push(b'\n');

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MetadataError::io(parent, e))?;
        }

        let temp_path = partial_path(path);
        let result = write_synced(&temp_path, &bytes).await;
        let result = match result {
            Ok(()) => tokio::fs::rename(&temp_path, path)
                .await
                .map_err(|e| MetadataError::io(path, e)),
            Err(e) => Err(e),
        };
        if result.is_err() {
            let _ = tokio::fs::remove_file(&temp_path).await;
        }
        result?;

        debug!(bytes = bytes.len(), "metadata document written");
        Ok(())
    }

    /// Writes `document` under the path derived from `identifier`.
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub async fn save(
        &self,
        identifier: &str,
        document: &MetadataDocument,
    ) -> Result<PathBuf, MetadataError> {
        let path = self.path_for(identifier);
        self.write(&path, document).await?;
        Ok(path)
    }

    /// Lists document files directly under the store directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Io`] if the directory cannot be listed.
    pub async fn scan(&self) -> Result<Vec<PathBuf>, MetadataError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| MetadataError::io(&self.dir, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MetadataError::io(&self.dir, e))?
        {
            let path = entry.path();
            let is_document = path
                .extension()
                .is_some_and(|ext| ext == METADATA_EXTENSION);
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if is_document && is_file {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), MetadataError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| MetadataError::io(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| MetadataError::io(path, e))?;
    file.sync_all()
        .await
        .map_err(|e| MetadataError::io(path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::metadata::ArtifactRecord;
    use crate::status::FetchStatus;

    fn sample_document() -> MetadataDocument {
        MetadataDocument::Singleton(
            ArtifactRecord::new(
                Some("Release".to_string()),
                "https://example.com/r.pdf",
                "r.pdf",
                FetchStatus::Success,
            )
            .with_field("date", "June 1, 2022"),
        )
    }

    #[test]
    fn test_path_for_replaces_slashes_and_sanitizes() {
        let store = MetadataStore::new("/data/bills");
        assert_eq!(
            store.path_for("0123/22"),
            PathBuf::from("/data/bills/0123_22.json")
        );
        assert_eq!(
            store.path_for("What: now?"),
            PathBuf::from("/data/bills/What_ now_.json")
        );
    }

    #[tokio::test]
    async fn test_save_then_load_returns_same_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("nested"));

        let path = store.save("release-1", &sample_document()).await.unwrap();

        assert_eq!(store.load(&path).await.unwrap(), sample_document());
        assert!(!partial_path(&path).exists());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"download_status\": \"Success\""));
    }

    #[tokio::test]
    async fn test_load_malformed_document_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let result = MetadataStore::new(temp_dir.path()).load(&path).await;

        assert!(matches!(result, Err(MetadataError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_scan_lists_only_json_files_sorted() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.json"), b"{}").unwrap();
        std::fs::write(temp_dir.path().join("a.json"), b"{}").unwrap();
        std::fs::write(temp_dir.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(temp_dir.path().join("c.json.part"), b"{}").unwrap();
        std::fs::create_dir(temp_dir.path().join("sub.json")).unwrap();

        let paths = MetadataStore::new(temp_dir.path()).scan().await.unwrap();

        assert_eq!(
            paths,
            vec![temp_dir.path().join("a.json"), temp_dir.path().join("b.json")]
        );
    }

    #[tokio::test]
    async fn test_scan_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = MetadataStore::new(temp_dir.path().join("absent"));

        assert!(matches!(store.scan().await, Err(MetadataError::Io { .. })));
    }
}
