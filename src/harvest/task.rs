//! Work items understood by the harvest handler.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One unit of harvesting work.
///
/// Deserialized from a JSON object: one carrying `documents` is a
/// [`DocumentTask`], anything else with a `url` is an [`ArtifactTask`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HarvestTask {
    /// An entity with several attachments, stored as an aggregate document.
    Document(DocumentTask),
    /// A single artifact, stored with a singleton document beside it.
    Artifact(ArtifactTask),
}

impl HarvestTask {
    /// A bare URL with no descriptive fields.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self::Artifact(ArtifactTask {
            url: url.into(),
            title: None,
            date: None,
            extra: Map::new(),
        })
    }

    /// Number of artifacts this task will fetch.
    #[must_use]
    pub fn artifact_count(&self) -> usize {
        match self {
            Self::Document(doc) => doc.documents.len(),
            Self::Artifact(_) => 1,
        }
    }
}

/// A single artifact such as a press release PDF.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArtifactTask {
    /// Source URL.
    pub url: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Publication date as displayed by the source.
    #[serde(default)]
    pub date: Option<String>,
    /// Other descriptive fields, copied into the metadata document.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An entity such as a bill, with its attached files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentTask {
    /// Stable identifier (e.g. a legislation number); names the document file.
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Attached files.
    pub documents: Vec<DocumentLink>,
    /// Other descriptive fields, copied into the metadata document.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One attachment of a [`DocumentTask`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentLink {
    /// Attachment title.
    #[serde(default)]
    pub title: Option<String>,
    /// Attachment URL.
    pub url: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_object_with_documents_is_document_task() {
        let task: HarvestTask = serde_json::from_value(json!({
            "id": "0123-22",
            "title": "An Act",
            "sponsor": "Delegate",
            "documents": [{"title": "Bill", "url": "https://example.com/b.pdf"}]
        }))
        .unwrap();

        let HarvestTask::Document(doc) = task else {
            panic!("expected document task");
        };
        assert_eq!(doc.id, "0123-22");
        assert_eq!(doc.documents.len(), 1);
        assert_eq!(doc.extra.get("sponsor"), Some(&json!("Delegate")));
    }

    #[test]
    fn test_object_with_url_is_artifact_task() {
        let task: HarvestTask = serde_json::from_value(json!({
            "url": "https://example.com/r.pdf",
            "title": "Release",
            "date": "May 3, 2022"
        }))
        .unwrap();

        assert_eq!(task.artifact_count(), 1);
        let HarvestTask::Artifact(artifact) = task else {
            panic!("expected artifact task");
        };
        assert_eq!(artifact.date.as_deref(), Some("May 3, 2022"));
        assert!(artifact.extra.is_empty());
    }

    #[test]
    fn test_object_without_url_or_documents_is_rejected() {
        let parsed: Result<HarvestTask, _> = serde_json::from_value(json!({"title": "x"}));
        assert!(parsed.is_err());
    }
}
