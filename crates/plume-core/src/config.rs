use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PlumeError, Result};

/// Root application configuration, loaded from `~/.config/plume/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub cache: CacheConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}

/// Third-party catalog search endpoint and its politeness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub search_path: String,
    /// Minimum delay between the start of two outbound requests.
    pub min_interval_secs: f64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    pub ttl_hours: u64,
    pub memory_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// How long a catalog snapshot is reused before being pulled again.
    pub snapshot_ttl_minutes: u64,
    /// Shortest normalized title allowed on the short side of a containment match.
    pub min_containment_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.babelio.com".to_string(),
            search_path: "/aj_recherche.php".to_string(),
            min_interval_secs: 5.0,
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            user_agent: format!("plume/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            ttl_hours: 24,
            memory_capacity: 100,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_minutes: 5,
            min_containment_len: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CatalogConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(self.min_interval_secs.max(0.0))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 60 * 60)
    }
}

impl MatchingConfig {
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_minutes * 60)
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/plume/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PLUME_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("plume")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog.base_url.trim().is_empty() {
            return Err(PlumeError::ConfigError("catalog.base_url is empty".into()));
        }
        if !self.catalog.min_interval_secs.is_finite() || self.catalog.min_interval_secs < 0.0 {
            return Err(PlumeError::ConfigError(format!(
                "catalog.min_interval_secs must be a non-negative number, got {}",
                self.catalog.min_interval_secs
            )));
        }
        if self.cache.memory_capacity == 0 {
            return Err(PlumeError::ConfigError(
                "cache.memory_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Directory holding the on-disk lookup cache.
    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache.directory {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("plume")
                .join("cache"),
        }
    }
}
