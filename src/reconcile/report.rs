//! Outcome of one reconciliation pass.

use std::fmt;
use std::path::PathBuf;

use crate::status::FetchStatus;

/// Identifies one record inside one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    /// The metadata document holding the record.
    pub document: PathBuf,
    /// Position of the record within the document.
    pub index: usize,
    /// Record title, if it has one.
    pub title: Option<String>,
    /// Record URL, if it has one.
    pub url: Option<String>,
}

/// A document that could not be read, parsed or rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIssue {
    /// The metadata document.
    pub document: PathBuf,
    /// Rendered error.
    pub reason: String,
}

/// A record that, after repair, still has no artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalGap {
    /// The record.
    pub record: RecordRef,
    /// Its recorded local path, if any.
    pub local_path: Option<PathBuf>,
    /// Its recorded status after repair.
    pub status: FetchStatus,
}

/// What a reconciliation pass found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Documents parsed during the scan.
    pub documents_scanned: usize,
    /// Records inspected during the scan.
    pub records_checked: usize,
    /// Records selected for repair.
    pub candidates: usize,
    /// Repairs that ended in `Success`.
    pub repaired: Vec<RecordRef>,
    /// Repairs that ended in `Failed` or `Not Found`, with the new status.
    pub still_failed: Vec<(RecordRef, FetchStatus)>,
    /// Candidates lacking a URL or local path.
    pub unrepairable: Vec<RecordRef>,
    /// Documents skipped because they could not be read or parsed.
    pub unreadable: Vec<DocumentIssue>,
    /// Documents whose updated statuses could not be written back.
    pub unwritable: Vec<DocumentIssue>,
    /// Post-repair audit: records with no usable artifact on disk.
    pub terminal_gaps: Vec<TerminalGap>,
}

impl RepairReport {
    /// Number of fetches the pass issued.
    #[must_use]
    pub fn repairs_attempted(&self) -> usize {
        self.repaired.len() + self.still_failed.len()
    }

    /// Terminal gaps that are not confirmed-absent (`Not Found`) resources.
    pub fn outstanding_gaps(&self) -> impl Iterator<Item = &TerminalGap> {
        self.terminal_gaps
            .iter()
            .filter(|gap| gap.status != FetchStatus::NotFound)
    }

    /// Whether every document was read and updated, and every record is
    /// either on disk or confirmed `Not Found`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.unreadable.is_empty()
            && self.unwritable.is_empty()
            && self.outstanding_gaps().next().is_none()
    }
}

impl fmt::Display for RepairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Scanned {} documents ({} records), {} needed repair",
            self.documents_scanned, self.records_checked, self.candidates
        )?;
        writeln!(
            f,
            "Repaired {}, still failing {}, unrepairable {}",
            self.repaired.len(),
            self.still_failed.len(),
            self.unrepairable.len()
        )?;
        if !self.unreadable.is_empty() {
            writeln!(f, "Skipped {} unreadable documents", self.unreadable.len())?;
        }
        if !self.unwritable.is_empty() {
            writeln!(f, "Could not update {} documents", self.unwritable.len())?;
        }
        write!(f, "Terminal gaps: {}", self.terminal_gaps.len())?;
        for gap in &self.terminal_gaps {
            let path = gap
                .local_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string());
            write!(
                f,
                "\n  [{}] {} -> {} ({})",
                gap.status,
                gap.record.url.as_deref().unwrap_or("<no url>"),
                path,
                gap.record.document.display()
            )?;
        }
        Ok(())
    }
}
