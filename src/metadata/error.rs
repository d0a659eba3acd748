//! Error types for metadata document persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading or writing a metadata document.
///
/// Every variant names the file it concerns; callers scanning a directory log
/// the error and move on to the next document.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Filesystem error reading, writing or listing metadata.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid metadata document.
    #[error("malformed metadata document {path}: {source}")]
    Parse {
        /// The document that failed to parse.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The document could not be serialized.
    #[error("cannot serialize metadata document {path}: {source}")]
    Serialize {
        /// The destination of the document.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl MetadataError {
    /// Creates an IO error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error for `path`.
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Creates a serialization error for `path`.
    pub fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }
}
