use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use plume_core::CatalogConfig;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ResolveError, Result};

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// HTTP client that lets one request through at a time and spaces request
/// starts by at least `min_interval`.
///
/// The gate is held for the whole round-trip, so concurrent callers queue in
/// arrival order and only ever see added latency.
pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimitedClient {
    pub fn new(
        min_interval: Duration,
        timeout: Duration,
        connect_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ResolveError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Self::new(
            config.min_interval(),
            config.request_timeout(),
            config.connect_timeout(),
            &config.user_agent,
        )
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Body of a successful response, `None` for any non-2xx status.
    /// Transport failures (timeout, refused connection) are returned as errors.
    pub async fn get_text(&self, url: &str) -> Result<Option<String>> {
        self.send(url, self.client.get(url)).await
    }

    /// POSTs `body` as JSON. The response body is returned as text whatever
    /// content type the server declares.
    pub async fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Result<Option<String>> {
        self.send(url, self.client.post(url).json(body)).await
    }

    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<Option<String>> {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(url, wait_ms = wait.as_millis() as u64, "rate limit wait");
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "non-success response");
            return Ok(None);
        }
        Ok(Some(resp.text().await?))
    }
}

// ─── DiskCache ────────────────────────────────────────────────────────────────

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// One JSON file per key under a single directory, expiring after `ttl`.
///
/// Writes go to a temporary file that is renamed over the entry, so a reader
/// sees either the old entry or the new one.
pub struct DiskCache {
    dir: PathBuf,
    ttl: chrono::Duration,
    clock: Clock,
}

#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    key_hash: String,
    stored_at: DateTime<Utc>,
    value: T,
}

/// `sha256(namespace + ":" + key)` with a namespace, `sha256(key)` without.
pub fn cache_key_hash(key: &str, namespace: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    if let Some(ns) = namespace {
        hasher.update(ns.as_bytes());
        hasher.update(b":");
    }
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        let dir = dir.into();
        let _ = std::fs::create_dir_all(&dir);
        Self {
            dir,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.json"))
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>) -> bool {
        (self.clock)() - stored_at <= self.ttl
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str, namespace: Option<&str>) -> Option<T> {
        let hash = cache_key_hash(key, namespace);
        let path = self.entry_path(&hash);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache read failed");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_slice(&data) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "evicting unreadable cache entry");
                let _ = tokio::fs::remove_file(&path).await;
                return None;
            }
        };

        if !self.is_fresh(entry.stored_at) {
            debug!(key, "cache entry expired");
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }
        Some(entry.value)
    }

    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        namespace: Option<&str>,
        value: &T,
    ) -> Result<()> {
        let hash = cache_key_hash(key, namespace);
        let entry = CacheEntry {
            key_hash: hash.clone(),
            stored_at: (self.clock)(),
            value,
        };
        let data = serde_json::to_vec(&entry).map_err(|e| ResolveError::Cache(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".{hash}.{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.entry_path(&hash)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn invalidate(&self, key: &str, namespace: Option<&str>) {
        let path = self.entry_path(&cache_key_hash(key, namespace));
        let _ = tokio::fs::remove_file(&path).await;
    }

    /// Removes every expired or unreadable entry and returns how many went.
    pub async fn sweep(&self) -> Result<usize> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let expired = match tokio::fs::read(&path).await {
                Ok(data) => match serde_json::from_slice::<CacheEntry<IgnoredAny>>(&data) {
                    Ok(entry) => !self.is_fresh(entry.stored_at),
                    Err(_) => true,
                },
                Err(_) => true,
            };
            if expired && tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }

        debug!(removed, dir = %self.dir.display(), "cache sweep finished");
        Ok(removed)
    }
}

// ─── MemoryCache ──────────────────────────────────────────────────────────────

/// Small in-process cache in front of [`DiskCache`]; evicts the oldest insert
/// once `capacity` is exceeded.
pub struct MemoryCache<V> {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<MemoryInner<V>>,
}

struct MemoryInner<V> {
    entries: HashMap<String, (Instant, V)>,
    order: VecDeque<String>,
}

impl<V: Clone> MemoryCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            inner: Mutex::new(MemoryInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock().await;
        let fresh = match inner.entries.get(key) {
            Some((at, _)) => at.elapsed() <= self.ttl,
            None => return None,
        };
        if !fresh {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            return None;
        }
        inner.entries.get(key).map(|(_, v)| v.clone())
    }

    pub async fn insert(&self, key: String, value: V) {
        let mut inner = self.inner.lock().await;
        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(key, (Instant::now(), value));

        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::TempDir;

    fn manual_clock(start: DateTime<Utc>) -> (Clock, Arc<std::sync::Mutex<DateTime<Utc>>>) {
        let now = Arc::new(std::sync::Mutex::new(start));
        let handle = now.clone();
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (clock, now)
    }

    fn test_client(min_interval: Duration) -> RateLimitedClient {
        RateLimitedClient::new(
            min_interval,
            Duration::from_secs(5),
            Duration::from_secs(2),
            "plume-test",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn cache_set_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path(), Duration::from_secs(60));
        cache.set("key1", None, &"hello world").await.unwrap();
        let val: Option<String> = cache.get("key1", None).await;
        assert_eq!(val, Some("hello world".to_string()));
    }

    #[tokio::test]
    async fn cache_namespaces_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path(), Duration::from_secs(60));
        cache.set("feu", Some("search"), &1u32).await.unwrap();
        cache.set("feu", Some("detail"), &2u32).await.unwrap();
        cache.set("feu", None, &3u32).await.unwrap();

        assert_eq!(cache.get::<u32>("feu", Some("search")).await, Some(1));
        assert_eq!(cache.get::<u32>("feu", Some("detail")).await, Some(2));
        assert_eq!(cache.get::<u32>("feu", None).await, Some(3));
        assert_ne!(cache_key_hash("feu", Some("search")), cache_key_hash("feu", None));
    }

    #[tokio::test]
    async fn cache_entry_expires_after_ttl() {
        let dir = TempDir::new().unwrap();
        let t0 = Utc::now();
        let (clock, now) = manual_clock(t0);
        let cache = DiskCache::new(dir.path(), Duration::from_secs(24 * 3600)).with_clock(clock);
        cache.set("houellebecq", Some("search"), &42u32).await.unwrap();

        *now.lock().unwrap() = t0 + chrono::Duration::hours(24) - chrono::Duration::seconds(1);
        assert_eq!(cache.get::<u32>("houellebecq", Some("search")).await, Some(42));

        *now.lock().unwrap() = t0 + chrono::Duration::hours(24) + chrono::Duration::seconds(1);
        assert_eq!(cache.get::<u32>("houellebecq", Some("search")).await, None);

        // evicted on access, so rewinding the clock does not bring it back
        *now.lock().unwrap() = t0;
        assert_eq!(cache.get::<u32>("houellebecq", Some("search")).await, None);
    }

    #[tokio::test]
    async fn cache_corrupted_entry_is_a_miss_and_evicted() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path(), Duration::from_secs(60));
        let path = dir
            .path()
            .join(format!("{}.json", cache_key_hash("broken", None)));
        std::fs::write(&path, b"{not json").unwrap();

        assert_eq!(cache.get::<u32>("broken", None).await, None);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn cache_set_replaces_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path(), Duration::from_secs(60));
        cache.set("k", None, &"first").await.unwrap();
        cache.set("k", None, &"second").await.unwrap();

        assert_eq!(cache.get::<String>("k", None).await.as_deref(), Some("second"));
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn cache_sweep_removes_expired_and_unparsable() {
        let dir = TempDir::new().unwrap();
        let t0 = Utc::now();
        let (clock, now) = manual_clock(t0);
        let cache = DiskCache::new(dir.path(), Duration::from_secs(3600)).with_clock(clock);

        cache.set("old-1", None, &1u32).await.unwrap();
        cache.set("old-2", Some("search"), &2u32).await.unwrap();
        *now.lock().unwrap() = t0 + chrono::Duration::minutes(90);
        cache.set("fresh", None, &3u32).await.unwrap();
        std::fs::write(dir.path().join("garbage.json"), b"[]").unwrap();

        assert_eq!(cache.sweep().await.unwrap(), 3);
        assert_eq!(cache.get::<u32>("fresh", None).await, Some(3));
        assert_eq!(cache.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn memory_cache_evicts_oldest() {
        let cache = MemoryCache::new(2, Duration::from_secs(60));
        cache.insert("a".into(), 1).await;
        cache.insert("b".into(), 2).await;
        cache.insert("a".into(), 10).await;
        cache.insert("c".into(), 3).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.get("a").await, Some(10));
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test]
    async fn memory_cache_honors_ttl() {
        let cache = MemoryCache::new(4, Duration::ZERO);
        cache.insert("a".into(), 1).await;
        sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("a").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn client_treats_non_success_as_none() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = test_client(Duration::ZERO);
        let body = client
            .get_text(&format!("{}/missing", server.url()))
            .await
            .unwrap();
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn client_propagates_connection_errors() {
        let client = test_client(Duration::ZERO);
        // port 9 (discard) is not listening on test hosts
        let err = client.get_text("http://127.0.0.1:9/").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn client_spaces_request_starts() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body("pong")
            .expect(3)
            .create_async()
            .await;

        let interval = Duration::from_millis(150);
        let client = test_client(interval);
        let url = format!("{}/ping", server.url());

        let start = Instant::now();
        let (a, b, c) = tokio::join!(
            client.get_text(&url),
            client.get_text(&url),
            client.get_text(&url)
        );
        let elapsed = start.elapsed();

        assert_eq!(a.unwrap().as_deref(), Some("pong"));
        assert_eq!(b.unwrap().as_deref(), Some("pong"));
        assert_eq!(c.unwrap().as_deref(), Some("pong"));
        assert!(elapsed >= interval * 2, "elapsed {elapsed:?}");
    }
}
