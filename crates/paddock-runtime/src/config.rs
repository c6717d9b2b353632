use crate::{Error, Result};
use paddock_cache::CachePolicy;
use paddock_engine::{MetricsOptions, ReconcileConfig};
use paddock_providers::RetryPolicy;
use paddock_types::Provider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";
pub const CACHE_DB_FILE: &str = "cache.db";

/// Resolve the workspace data directory path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. PADDOCK_PATH environment variable (with tilde expansion)
/// 3. XDG data directory (recommended default)
/// 4. ~/.paddock (fallback for systems without XDG)
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("PADDOCK_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("paddock"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".paddock"));
    }

    Err(Error::Config(
        "Could not determine workspace path: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub enabled: bool,
    /// Payload root; defaults to `payloads/<provider>` under the data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub rich: ProviderConfig,
    pub live: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Rich => &self.rich,
            Provider::Live => &self.live,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Persist bundles in SQLite; memory-only when false
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Seasons at or after this one are treated as still changing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_season: Option<i32>,
    pub empty_ttl_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_after_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let policy = CachePolicy::default();
        Self {
            enabled: true,
            path: None,
            current_season: None,
            empty_ttl_secs: policy.empty_ttl.as_secs(),
            refresh_after_secs: policy.refresh_after.map(|d| d.as_secs()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sessions fetched at once during aggregation
    pub max_concurrency: usize,
    /// Per-session budget, retries included
    pub fetch_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub providers: ProvidersConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub retry: RetryConfig,
    pub reconcile: ReconcileConfig,
    pub metrics: MetricsOptions,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_concurrency == 0 {
            return Err(Error::Config("pipeline.max_concurrency must be at least 1".into()));
        }
        if self.pipeline.fetch_timeout_secs == 0 {
            return Err(Error::Config("pipeline.fetch_timeout_secs must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::Config(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }
        let factor = self.metrics.outlier_factor;
        if factor.is_nan() || factor <= 1.0 {
            return Err(Error::Config("metrics.outlier_factor must be greater than 1.0".into()));
        }
        if self.metrics.median_window == 0 {
            return Err(Error::Config("metrics.median_window must be at least 1".into()));
        }
        if !self.providers.rich.enabled && !self.providers.live.enabled {
            return Err(Error::Config("at least one provider must be enabled".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            current_season: self.cache.current_season,
            empty_ttl: Duration::from_secs(self.cache.empty_ttl_secs),
            refresh_after: self.cache.refresh_after_secs.map(Duration::from_secs),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.fetch_timeout_secs)
    }

    /// SQLite file for the persistent cache under `data_dir`
    pub fn cache_path(&self, data_dir: &Path) -> PathBuf {
        match &self.cache.path {
            Some(path) => expand_tilde(path),
            None => data_dir.join(CACHE_DB_FILE),
        }
    }

    pub fn provider_root(&self, provider: Provider, data_dir: &Path) -> PathBuf {
        paddock_providers::resolve_root(
            provider,
            self.providers.get(provider).root.as_deref(),
            data_dir,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.providers.rich.enabled);
        assert_eq!(config.pipeline.max_concurrency, 4);
        assert_eq!(config.reconcile.lap_tolerance_ms, 1);
        assert_eq!(config.metrics.median_window, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join(CONFIG_FILE);

        let mut config = Config::default();
        config.providers.live.enabled = false;
        config.cache.current_season = Some(2025);
        config.reconcile.sector_tolerance_ms = 5;

        config.save_to(&config_path)?;
        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(
            &config_path,
            "[pipeline]\nmax_concurrency = 2\n\n[metrics]\noutlier_factor = 1.2\n",
        )?;

        let config = Config::load_from(&config_path)?;
        assert_eq!(config.pipeline.max_concurrency, 2);
        assert_eq!(config.pipeline.fetch_timeout_secs, 30);
        assert_eq!(config.metrics.outlier_factor, 1.2);
        assert_eq!(config.metrics.median_window, 5);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.pipeline.max_concurrency = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.metrics.outlier_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.providers.rich.enabled = false;
        config.providers.live.enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_nonexistent_returns_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = Config::load_from(&temp_dir.path().join("missing.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_explicit_workspace_path_wins() -> Result<()> {
        assert_eq!(
            resolve_workspace_path(Some("/srv/paddock"))?,
            PathBuf::from("/srv/paddock")
        );
        Ok(())
    }
}
