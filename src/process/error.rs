//! Error types for text processing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors extracting text from a harvested file.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The directory to process does not exist.
    #[error("directory {path} does not exist")]
    MissingRoot {
        /// The missing directory.
        path: PathBuf,
    },

    /// The file could not be read as UTF-8 text.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No text extractor handles this file's format.
    #[error("no text extractor for {path}")]
    Unsupported {
        /// The skipped file.
        path: PathBuf,
    },
}

impl ProcessError {
    /// Creates an IO error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
