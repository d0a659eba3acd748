//! Metadata document shapes and the artifact records they embed.

use std::path::PathBuf;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::status::FetchStatus;

/// One artifact's persisted view: where it came from, where it lives, and
/// how fetching it went.
///
/// Fields other than the four known ones (such as `date`) are kept in
/// `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Human-readable title or number.
    #[serde(default)]
    pub title: Option<String>,
    /// Source URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Where the artifact is (or should be) stored.
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    /// Outcome of the most recent fetch.
    pub download_status: FetchStatus,
    /// Descriptive fields preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArtifactRecord {
    /// Creates a record with no extra fields.
    #[must_use]
    pub fn new(
        title: Option<String>,
        url: impl Into<String>,
        local_path: impl Into<PathBuf>,
        download_status: FetchStatus,
    ) -> Self {
        Self {
            title,
            url: Some(url.into()),
            local_path: Some(local_path.into()),
            download_status,
            extra: Map::new(),
        }
    }

    /// Adds a descriptive field, replacing any previous value.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// An entity holding a list of artifacts, such as a bill and its attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDocument {
    /// The embedded artifact records.
    pub documents: Vec<ArtifactRecord>,
    /// Descriptive fields of the entity itself.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A persisted metadata document in one of its two shapes.
///
/// A JSON object carrying a `documents` key is read as an aggregate; any other
/// object must be a single top-level [`ArtifactRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataDocument {
    /// Descriptive fields plus `documents: [ArtifactRecord, ...]`.
    Aggregate(AggregateDocument),
    /// A single record at the top level.
    Singleton(ArtifactRecord),
}

impl MetadataDocument {
    /// The records embedded in this document, in file order.
    #[must_use]
    pub fn records(&self) -> &[ArtifactRecord] {
        match self {
            Self::Aggregate(doc) => &doc.documents,
            Self::Singleton(record) => std::slice::from_ref(record),
        }
    }

    /// Mutable access to the embedded records, in file order.
    pub fn records_mut(&mut self) -> &mut [ArtifactRecord] {
        match self {
            Self::Aggregate(doc) => &mut doc.documents,
            Self::Singleton(record) => std::slice::from_mut(record),
        }
    }
}

impl<'de> Deserialize<'de> for MetadataDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(de::Error::custom("metadata document must be a JSON object"));
        }
        if value.get("documents").is_some() {
            AggregateDocument::deserialize(value)
                .map(Self::Aggregate)
                .map_err(de::Error::custom)
        } else {
            ArtifactRecord::deserialize(value)
                .map(Self::Singleton)
                .map_err(de::Error::custom)
        }
    }
}
