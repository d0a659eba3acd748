//! Constants for the download module (timeouts, retry defaults).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of fetch attempts, including the first one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default fixed wait between fetch attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Suffix of the in-progress file a body is streamed into before rename.
pub(crate) const PARTIAL_SUFFIX: &str = ".part";
