//! Post-harvest text processing.
//!
//! A [`Processor`] walks a harvested directory, reads the text of every
//! Markdown and plain-text file, splits it into paragraphs and derives
//! [`DocumentFacts`] for it. PDF files are recognised and reported as
//! unsupported. Metadata documents and other files are ignored.

mod error;
mod facts;
mod text;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

pub use error::ProcessError;
pub use facts::{DocumentFacts, SourceRule, UNKNOWN_SOURCE, extract_facts, find_resolution_number};
pub use text::{TextFormat, chunk_by_paragraph, extract_text};

/// One file whose text was extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedFile {
    /// Facts derived from the path and text.
    #[serde(flatten)]
    pub facts: DocumentFacts,
    /// The text split into paragraphs.
    pub chunks: Vec<String>,
}

/// A file that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIssue {
    /// The file or directory involved.
    pub path: PathBuf,
    /// Rendered error.
    pub reason: String,
}

/// What a processing pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Files with at least one paragraph, in path order.
    pub processed: Vec<ProcessedFile>,
    /// Files with no extractor for their format.
    pub unsupported: Vec<PathBuf>,
    /// Files whose text held no paragraph.
    pub empty: Vec<PathBuf>,
    /// Files or directories that could not be read.
    pub unreadable: Vec<FileIssue>,
}

impl ProcessReport {
    /// Whether every candidate file could be read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unreadable.is_empty()
    }

    /// Total paragraphs across processed files.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.processed.iter().map(|file| file.chunks.len()).sum()
    }
}

impl fmt::Display for ProcessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} files ({} paragraphs), {} empty, {} unsupported, {} unreadable",
            self.processed.len(),
            self.chunk_count(),
            self.empty.len(),
            self.unsupported.len(),
            self.unreadable.len()
        )?;
        for file in &self.processed {
            write!(f, "\n  [{}] {}", file.facts.source, file.facts.title)?;
            if let Some(number) = &file.facts.resolution_number {
                write!(f, " ({number})")?;
            }
        }
        Ok(())
    }
}

/// Extracts text and facts from a directory tree.
#[derive(Debug, Clone, Default)]
pub struct Processor {
    sources: Vec<SourceRule>,
}

impl Processor {
    /// Creates a processor with no source rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule labelling files under a `segment` directory as `label`.
    ///
    /// Rules are tried in the order they were added.
    #[must_use]
    pub fn with_source(mut self, segment: impl Into<String>, label: impl Into<String>) -> Self {
        self.sources.push(SourceRule {
            segment: segment.into(),
            label: label.into(),
        });
        self
    }

    /// Processes every candidate file under `root`, recursively, in path
    /// order.
    ///
    /// Per-file failures are logged and listed in the report.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::MissingRoot`] if `root` is not a directory.
    pub fn process_dir(&self, root: &Path) -> Result<ProcessReport, ProcessError> {
        if !root.is_dir() {
            return Err(ProcessError::MissingRoot {
                path: root.to_path_buf(),
            });
        }

        let mut report = ProcessReport::default();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    error!(path = %path.display(), error = %e, "cannot walk directory entry");
                    report.unreadable.push(FileIssue {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(format) = TextFormat::from_path(path) else {
                continue;
            };
            if !format.is_extractable() {
                warn!(path = %path.display(), ?format, "no text extractor for format, skipping");
                report.unsupported.push(path.to_path_buf());
                continue;
            }
            self.process_file(root, path, &mut report);
        }

        info!(
            processed = report.processed.len(),
            empty = report.empty.len(),
            unsupported = report.unsupported.len(),
            unreadable = report.unreadable.len(),
            "processing pass complete"
        );
        Ok(report)
    }

    fn process_file(&self, root: &Path, path: &Path, report: &mut ProcessReport) {
        debug!(path = %path.display(), "extracting text");
        let text = match extract_text(path) {
            Ok(text) => text,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to extract text");
                report.unreadable.push(FileIssue {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        let chunks = chunk_by_paragraph(&text);
        if chunks.is_empty() {
            warn!(path = %path.display(), "no text extracted");
            report.empty.push(path.to_path_buf());
            return;
        }

        let facts = extract_facts(root, path, &text, &self.sources);
        info!(
            path = %path.display(),
            title = %facts.title,
            source = %facts.source,
            chunks = chunks.len(),
            "extracted text"
        );
        report.processed.push(ProcessedFile { facts, chunks });
    }
}
