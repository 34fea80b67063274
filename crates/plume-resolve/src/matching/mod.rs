//! Canonical matching: binds extracted mentions to an in-memory catalog
//! snapshot.

pub mod author;
pub mod matcher;
pub mod snapshot;

pub use author::{author_matches, canonical_author, names_agree};
pub use matcher::CanonicalMatcher;
pub use snapshot::{CatalogSource, JsonCatalogSource, SnapshotCache};
