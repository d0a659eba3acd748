//! Per-entity JSON metadata documents and the store that persists them.
//!
//! A document is either an aggregate (descriptive fields plus a `documents`
//! array of [`ArtifactRecord`]s) or a singleton (one record at the top
//! level). Each lives in its own `<identifier>.json` file next to the
//! artifacts it describes.

mod error;
mod record;
mod store;

pub use error::MetadataError;
pub use record::{AggregateDocument, ArtifactRecord, MetadataDocument};
pub use store::{METADATA_EXTENSION, MetadataStore};
