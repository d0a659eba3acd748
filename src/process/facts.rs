//! Descriptive facts derived from a file's path and text.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Source label used when neither a rule nor a subdirectory names one.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Matches legislative resolution numbers such as `CMY-44-22`.
#[allow(clippy::expect_used)]
static RESOLUTION_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z]{2,3}-\d{2,3}-\d{2}").expect("resolution number regex is valid")
});

/// Maps a directory name anywhere below the processed root to a source label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRule {
    /// Directory name to look for.
    pub segment: String,
    /// Label recorded when it is present.
    pub label: String,
}

/// What processing learned about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFacts {
    /// Where the file came from.
    pub source: String,
    /// The file stem.
    pub title: String,
    /// The file's path as walked.
    pub original_path: PathBuf,
    /// First resolution number in the text, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_number: Option<String>,
}

/// Derives facts for `path`, a file found under `root`.
///
/// The source is the label of the first rule whose segment is a directory
/// between `root` and the file; failing that, the first such directory; failing
/// that, [`UNKNOWN_SOURCE`].
#[must_use]
pub fn extract_facts(root: &Path, path: &Path, text: &str, rules: &[SourceRule]) -> DocumentFacts {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let directories: Vec<&str> = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|component| match component {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();

    let source = rules
        .iter()
        .find(|rule| directories.contains(&rule.segment.as_str()))
        .map(|rule| rule.label.clone())
        .or_else(|| directories.first().map(|dir| (*dir).to_string()))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

    DocumentFacts {
        source,
        title: path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        original_path: path.to_path_buf(),
        resolution_number: find_resolution_number(text).map(str::to_string),
    }
}

/// Returns the first resolution number in `text`.
#[must_use]
pub fn find_resolution_number(text: &str) -> Option<&str> {
    RESOLUTION_NUMBER.find(text).map(|found| found.as_str())
}
