use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::CredentialStore;
use crate::cache::FeedCache;
use crate::error::DashboardError;
use crate::feed::{self, FeedSource};
use crate::types::{Config, Dataset};

/// Process-wide state shared by every session.
///
/// Only the feed cache changes after startup, and only through
/// `dataset()` / `refresh()`.
pub struct AppState {
    pub config: Config,
    pub credentials: CredentialStore,
    source: Box<dyn FeedSource>,
    cache: FeedCache,
}

impl AppState {
    pub fn new(config: Config, source: Box<dyn FeedSource>, credentials: CredentialStore) -> Self {
        let cache = FeedCache::new(Duration::from_secs(config.cache_ttl_secs));
        Self {
            config,
            credentials,
            source,
            cache,
        }
    }

    /// Current feed snapshot, fetching if the cached one is stale.
    pub fn dataset(&self) -> Result<Arc<Dataset>, DashboardError> {
        self.cache
            .get_or_load(|| feed::load_dataset(self.source.as_ref(), &self.config))
    }

    /// Manual refresh: the next `dataset()` call re-fetches.
    pub fn refresh(&self) {
        self.cache.invalidate();
    }

    pub fn cache_age(&self) -> Option<Duration> {
        self.cache.age()
    }
}

/// Get the state directory (~/.visitboard)
pub fn state_dir() -> Result<PathBuf, DashboardError> {
    let home = dirs::home_dir().ok_or_else(|| {
        DashboardError::Configuration("Could not find home directory".to_string())
    })?;
    Ok(home.join(".visitboard"))
}

/// Get the canonical config file path (~/.visitboard/config.json)
pub fn config_path() -> Result<PathBuf, DashboardError> {
    Ok(state_dir()?.join("config.json"))
}

/// Load configuration from `path`, or ~/.visitboard/config.json.
///
/// A missing file yields defaults; a malformed one is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, DashboardError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;
    let config: Config = serde_json::from_str(&content).map_err(|e| {
        DashboardError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    Ok(config)
}

/// Where the credential artifact lives: config value, else ~/.visitboard/users.json.
pub fn credentials_path(config: &Config) -> Result<PathBuf, DashboardError> {
    match &config.credentials_path {
        Some(p) if !p.trim().is_empty() => Ok(PathBuf::from(p.trim())),
        _ => Ok(state_dir()?.join("users.json")),
    }
}
