//! Text extraction and paragraph chunking.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::error::ProcessError;

/// A blank line, possibly holding whitespace, between two paragraphs.
#[allow(clippy::expect_used)]
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph regex is valid"));

/// File formats picked up by a processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// `.md` / `.markdown`, read verbatim.
    Markdown,
    /// `.txt`, read verbatim.
    PlainText,
    /// `.pdf`, recognised but not extracted.
    Pdf,
}

impl TextFormat {
    /// Detects the format from the file extension, case-insensitively.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "txt" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Whether [`extract_text`] can read this format.
    #[must_use]
    pub fn is_extractable(self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// Reads the text content of `path`.
///
/// # Errors
///
/// Returns [`ProcessError::Unsupported`] for formats without an extractor and
/// [`ProcessError::Io`] when the file cannot be read as UTF-8.
pub fn extract_text(path: &Path) -> Result<String, ProcessError> {
    match TextFormat::from_path(path) {
        Some(format) if format.is_extractable() => {
            fs::read_to_string(path).map_err(|e| ProcessError::io(path, e))
        }
        _ => Err(ProcessError::Unsupported {
            path: path.to_path_buf(),
        }),
    }
}

/// Splits `text` into trimmed, non-empty paragraphs separated by blank lines.
#[must_use]
pub fn chunk_by_paragraph(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}
