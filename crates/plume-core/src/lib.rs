pub mod config;
pub mod error;
pub mod models;

pub use config::{AppConfig, CacheConfig, CatalogConfig, LoggingConfig, MatchingConfig};
pub use error::{PlumeError, Result};
pub use models::*;
