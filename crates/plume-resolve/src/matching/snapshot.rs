use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use plume_core::CatalogSnapshot;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ResolveError, Result};

/// Where canonical catalog snapshots come from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_snapshot(&self) -> Result<CatalogSnapshot>;
}

/// A snapshot serialized as JSON (`{"books": [...], "authors": [...]}`).
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for JsonCatalogSource {
    async fn load_snapshot(&self) -> Result<CatalogSnapshot> {
        let data = tokio::fs::read(&self.path).await?;
        serde_json::from_slice(&data)
            .map_err(|e| ResolveError::Parse(format!("{}: {e}", self.path.display())))
    }
}

/// Serves one shared snapshot until it is older than `ttl`, then reloads it.
///
/// Callers keep the `Arc` they were handed for the whole resolution pass, so a
/// reload never changes a pass already running.
pub struct SnapshotCache<S> {
    source: S,
    ttl: Duration,
    current: Mutex<Option<(Instant, Arc<CatalogSnapshot>)>>,
}

impl<S: CatalogSource> SnapshotCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>> {
        let mut current = self.current.lock().await;
        if let Some((loaded_at, snapshot)) = current.as_ref() {
            if loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(snapshot));
            }
        }

        let snapshot = Arc::new(self.source.load_snapshot().await?);
        debug!(
            books = snapshot.books.len(),
            authors = snapshot.authors.len(),
            "catalog snapshot loaded"
        );
        *current = Some((Instant::now(), Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
