use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Transport failure talking to the catalog: timeout, refused connection, reset.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("catalog source error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] plume_core::PlumeError),
}

impl ResolveError {
    /// Whether retrying later could succeed. A batch run should stop on these
    /// instead of recording the lookup as a miss.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
