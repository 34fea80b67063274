//! Plume resolve — normalization, catalog matching, external catalog verification.

pub mod catalog;
pub mod error;
pub mod http;
pub mod matching;
pub mod text;

pub use catalog::{CatalogClient, SearchRecord};
pub use error::{ResolveError, Result};
pub use http::{DiskCache, MemoryCache, RateLimitedClient};
pub use matching::{CanonicalMatcher, CatalogSource, JsonCatalogSource, SnapshotCache};
pub use text::{normalize, similarity};
