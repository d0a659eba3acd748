//! Terminal outcome of one fetch, as recorded in metadata documents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of fetching one artifact.
///
/// Serialized as the literal strings `"Success"`, `"Not Found"` and `"Failed"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchStatus {
    /// Bytes are at the destination path (freshly written or already present).
    #[serde(rename = "Success")]
    Success,
    /// The server reported the resource missing. Never retried.
    #[serde(rename = "Not Found")]
    NotFound,
    /// Every attempt failed with a transient or unknown error.
    #[serde(rename = "Failed")]
    Failed,
}

impl FetchStatus {
    /// Returns the persisted label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NotFound => "Not Found",
            Self::Failed => "Failed",
        }
    }

    /// Whether this status is final and must not be retried.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_status_serializes_to_persisted_labels() {
        assert_eq!(
            serde_json::to_string(&FetchStatus::Success).unwrap(),
            "\"Success\""
        );
        assert_eq!(
            serde_json::to_string(&FetchStatus::NotFound).unwrap(),
            "\"Not Found\""
        );
        assert_eq!(
            serde_json::to_string(&FetchStatus::Failed).unwrap(),
            "\"Failed\""
        );
    }

    #[test]
    fn test_fetch_status_rejects_unknown_label() {
        let parsed: Result<FetchStatus, _> = serde_json::from_str("\"NotFound\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_only_not_found_is_terminal() {
        assert!(FetchStatus::NotFound.is_terminal());
        assert!(!FetchStatus::Failed.is_terminal());
        assert!(!FetchStatus::Success.is_terminal());
    }
}
