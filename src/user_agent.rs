//! User-Agent string sent with every artifact request.

/// Default User-Agent for fetch requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    format!("{name}/{version} (document-harvester)")
}
