//! Concrete work for the pool: fetch artifacts, then record them.
//!
//! [`parse_tasks`] turns input lines into [`HarvestTask`]s, and a
//! [`HarvestHandler`] processes each one by fetching its artifacts and
//! writing the matching metadata document.

mod handler;
mod input;
mod task;

pub use handler::HarvestHandler;
pub use input::{InputError, MAX_URL_LENGTH, ParsedInput, parse_tasks};
pub use task::{ArtifactTask, DocumentLink, DocumentTask, HarvestTask};
