//! Turns free-form input lines into harvest tasks.
//!
//! Each non-empty line is either a JSON task object (starting with `{`) or
//! free text from which every http(s) URL is extracted. Lines starting with
//! `#` are comments.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

use super::task::HarvestTask;

/// Maximum accepted URL length.
pub const MAX_URL_LENGTH: usize = 2000;

/// Matches http:// and https:// URLs, stopping at whitespace or common delimiters.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'\]]+"#).expect("URL regex is valid"));

/// A line or URL that could not become a task.
#[derive(Debug, Error)]
pub enum InputError {
    /// A line looked like JSON but was not a valid task object.
    #[error("line {line}: invalid task object: {source}")]
    InvalidTask {
        /// 1-based line number.
        line: usize,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A URL candidate failed validation.
    #[error("line {line}: invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// 1-based line number.
        line: usize,
        /// The rejected URL text.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Tasks parsed from input, plus whatever was rejected along the way.
#[derive(Debug, Default)]
pub struct ParsedInput {
    /// Accepted tasks, in input order.
    pub tasks: Vec<HarvestTask>,
    /// Rejected lines and URLs.
    pub rejected: Vec<InputError>,
}

/// Parses every line of `input`.
#[must_use]
pub fn parse_tasks(input: &str) -> ParsedInput {
    let mut parsed = ParsedInput::default();

    for (index, raw_line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('{') {
            match serde_json::from_str::<HarvestTask>(line) {
                Ok(task) => parsed.tasks.push(task),
                Err(source) => parsed.rejected.push(InputError::InvalidTask {
                    line: line_number,
                    source,
                }),
            }
            continue;
        }

        for url_match in URL_PATTERN.find_iter(line) {
            let cleaned = clean_url_trailing(url_match.as_str());
            trace!(url = %cleaned, "found URL candidate");
            match validate_url(cleaned) {
                Ok(url) => parsed.tasks.push(HarvestTask::url(url)),
                Err(reason) => {
                    debug!(url = %cleaned, %reason, "URL validation failed");
                    parsed.rejected.push(InputError::InvalidUrl {
                        line: line_number,
                        url: cleaned.to_string(),
                        reason,
                    });
                }
            }
        }
    }

    parsed
}

/// Strips sentence punctuation and unbalanced closing brackets from a URL
/// found in running text.
fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' => {
                result = &result[..result.len() - 1];
            }
            ')' | ']' => {
                let open = if last == ')' { '(' } else { '[' };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}

fn validate_url(raw: &str) -> Result<String, String> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(format!("longer than {MAX_URL_LENGTH} characters"));
    }
    let parsed = Url::parse(raw).map_err(|e| e.to_string())?;
    if parsed.host().is_none() {
        return Err("missing host".to_string());
    }
    Ok(parsed.to_string())
}
