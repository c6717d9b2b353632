use paddock_cache::{CacheOutcome, CacheStats, Freshness, SessionCache, SqliteStore};
use paddock_engine::{MetricsOptions, compare_drivers, compute_metrics};
use paddock_providers::{ProviderAdapter, create_adapter};
use paddock_types::{
    AggregateReport, CacheEntry, DeltaReference, DriverCode, DriverComparison, DriverInfo,
    EventId, ListingGap, MetricsReport, Provider, SessionKey,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::aggregator::HistoricalAggregator;
use crate::config::{CONFIG_FILE, Config};
use crate::filter::AggregateQuery;
use crate::init::{InitResult, InitService};
use crate::pipeline::SessionPipeline;
use crate::{Error, Result};

/// One reconciled session together with its derived metrics
#[derive(Debug, Clone)]
pub struct SessionView {
    pub entry: CacheEntry,
    pub outcome: CacheOutcome,
    pub metrics: MetricsReport,
}

/// Process-wide entry point: configuration, providers, cache and
/// aggregation wired together for one data directory.
pub struct Paddock {
    data_dir: PathBuf,
    config: Config,
    pipeline: SessionPipeline,
    aggregator: HistoricalAggregator,
}

impl Paddock {
    pub fn setup(data_dir: &Path) -> Result<InitResult> {
        InitService::run(data_dir)
    }

    /// Load `config.toml` (defaults when absent) and build the directory
    /// adapters plus the persistent cache
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        let config = Config::load_from(&data_dir.join(CONFIG_FILE))?;
        config.validate()?;

        let adapter = |provider: Provider| -> Option<Arc<dyn ProviderAdapter>> {
            config.providers.get(provider).enabled.then(|| {
                let root = config.provider_root(provider, &data_dir);
                debug!(provider = %provider, root = %root.display(), "provider enabled");
                create_adapter(provider, root, config.retry_policy())
            })
        };
        let rich = adapter(Provider::Rich);
        let live = adapter(Provider::Live);

        let cache = if config.cache.enabled {
            let store = SqliteStore::open(&config.cache_path(&data_dir))?;
            let purged = store.purge_expired(chrono::Utc::now())?;
            if purged > 0 {
                debug!(purged, "expired negative entries purged");
            }
            SessionCache::with_store(store, config.cache_policy())
        } else {
            SessionCache::in_memory(config.cache_policy())
        };

        Ok(Self::with_parts(data_dir, config, rich, live, cache))
    }

    /// Assemble from already-built adapters and cache
    pub fn with_parts(
        data_dir: PathBuf,
        config: Config,
        rich: Option<Arc<dyn ProviderAdapter>>,
        live: Option<Arc<dyn ProviderAdapter>>,
        cache: SessionCache,
    ) -> Self {
        let pipeline = SessionPipeline::new(rich, live, cache, config.reconcile);
        let aggregator = HistoricalAggregator::new(
            pipeline.clone(),
            config.metrics.clone(),
            config.pipeline.max_concurrency,
            config.fetch_timeout(),
        );
        Self {
            data_dir,
            config,
            pipeline,
            aggregator,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &SessionPipeline {
        &self.pipeline
    }

    pub fn aggregator(&self) -> &HistoricalAggregator {
        &self.aggregator
    }

    fn metrics_options(&self, reference: DeltaReference) -> MetricsOptions {
        self.config.metrics.clone().with_reference(reference)
    }

    /// Reconciled bundle plus metrics, bounded by the configured timeout
    pub async fn session(
        &self,
        key: &SessionKey,
        freshness: Freshness,
        reference: DeltaReference,
    ) -> Result<SessionView> {
        let fetched =
            tokio::time::timeout(self.config.fetch_timeout(), self.pipeline.session(key, freshness))
                .await
                .map_err(|_| Error::Timeout {
                    key: key.canonical(),
                    secs: self.config.pipeline.fetch_timeout_secs,
                })?;
        let (entry, outcome) = fetched?;

        if let DeltaReference::Driver(code) = &reference
            && !entry.bundle.source_attribution.contains_key(code)
        {
            return Err(Error::InvalidQuery(format!(
                "reference driver {} did not take part in {}",
                code, key
            )));
        }

        let metrics = compute_metrics(&entry.bundle, &self.metrics_options(reference));
        Ok(SessionView {
            entry,
            outcome,
            metrics,
        })
    }

    pub async fn compare(
        &self,
        key: &SessionKey,
        a: &DriverCode,
        b: &DriverCode,
        freshness: Freshness,
    ) -> Result<DriverComparison> {
        let view = self.session(key, freshness, DeltaReference::SessionFastest).await?;
        let bundle = &view.entry.bundle;
        for driver in [a, b] {
            if !bundle.source_attribution.contains_key(driver) {
                return Err(Error::InvalidQuery(format!(
                    "{} did not take part in {}",
                    driver, key
                )));
            }
        }
        Ok(compare_drivers(bundle, a, b))
    }

    pub async fn aggregate(&self, query: &AggregateQuery, freshness: Freshness) -> AggregateReport {
        self.aggregator.aggregate(query, freshness).await
    }

    pub async fn calendar(&self, season: i32) -> (Vec<SessionKey>, Vec<ListingGap>) {
        self.pipeline.list_sessions(season).await
    }

    pub async fn drivers(&self, season: i32, event: &EventId) -> Result<Vec<DriverInfo>> {
        Ok(self.pipeline.list_drivers(season, event).await?)
    }

    pub fn cache_stats(&self) -> Result<CacheStats> {
        Ok(self.pipeline.cache().stats()?)
    }

    pub fn invalidate(&self, key: &SessionKey) -> bool {
        self.pipeline.cache().invalidate(key)
    }

    pub fn clear_cache(&self) -> Result<usize> {
        Ok(self.pipeline.cache().clear()?)
    }
}
