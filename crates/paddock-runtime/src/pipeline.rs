use paddock_cache::{CacheOutcome, Freshness, SessionCache};
use paddock_engine::ReconcileConfig;
use paddock_providers::{FetchResult, ProviderAdapter};
use paddock_types::{
    CacheEntry, DriverInfo, EventId, FetchError, ListingGap, NormalizedRecord, Provider,
    ProviderFailure, SessionBundle, SessionKey,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::aggregator::skip_reason;

/// Cache → (rich ∥ live) → reconcile for one session at a time.
///
/// Either provider may be disabled; a disabled provider answers every
/// request with `NotFound`.
#[derive(Clone)]
pub struct SessionPipeline {
    rich: Option<Arc<dyn ProviderAdapter>>,
    live: Option<Arc<dyn ProviderAdapter>>,
    cache: SessionCache,
    reconcile: ReconcileConfig,
}

async fn fetch_side(
    adapter: Option<Arc<dyn ProviderAdapter>>,
    key: &SessionKey,
) -> FetchResult<Vec<NormalizedRecord>> {
    match adapter {
        Some(adapter) => adapter.fetch_session(key).await,
        None => Err(FetchError::not_found("provider disabled")),
    }
}

/// Roster problems never fail a session
async fn roster_side(adapter: Option<Arc<dyn ProviderAdapter>>, key: &SessionKey) -> Vec<DriverInfo> {
    let Some(adapter) = adapter else {
        return Vec::new();
    };
    match adapter.list_drivers(key.season, &key.event).await {
        Ok(roster) => roster,
        Err(err) => {
            debug!(key = %key, provider = %adapter.provider(), error = %err, "roster unavailable");
            Vec::new()
        }
    }
}

impl SessionPipeline {
    pub fn new(
        rich: Option<Arc<dyn ProviderAdapter>>,
        live: Option<Arc<dyn ProviderAdapter>>,
        cache: SessionCache,
        reconcile: ReconcileConfig,
    ) -> Self {
        Self {
            rich,
            live,
            cache,
            reconcile,
        }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    fn adapters(&self) -> impl Iterator<Item = &Arc<dyn ProviderAdapter>> {
        self.rich.iter().chain(self.live.iter())
    }

    async fn fetch_and_reconcile(
        rich: Option<Arc<dyn ProviderAdapter>>,
        live: Option<Arc<dyn ProviderAdapter>>,
        key: SessionKey,
        config: ReconcileConfig,
    ) -> Result<SessionBundle, ProviderFailure> {
        debug!(key = %key, "fetching session from providers");
        let (rich_laps, live_laps, rich_roster, live_roster) = tokio::join!(
            fetch_side(rich.clone(), &key),
            fetch_side(live.clone(), &key),
            roster_side(rich, &key),
            roster_side(live, &key),
        );
        paddock_engine::build_bundle(
            &key,
            rich_laps,
            live_laps,
            (rich_roster, live_roster),
            &config,
        )
    }

    /// Reconciled bundle for `key`, through the cache.
    ///
    /// Concurrent calls for the same key share one provider round trip.
    pub async fn session(
        &self,
        key: &SessionKey,
        freshness: Freshness,
    ) -> Result<(CacheEntry, CacheOutcome), ProviderFailure> {
        let rich = self.rich.clone();
        let live = self.live.clone();
        let config = self.reconcile;
        let owned_key = key.clone();

        let (entry, outcome) = self
            .cache
            .get_or_fetch(key, freshness, move || {
                Self::fetch_and_reconcile(rich, live, owned_key, config)
            })
            .await?;

        info!(key = %key, outcome = ?outcome, completeness = %entry.bundle.completeness, "session ready");
        Ok((entry, outcome))
    }

    /// Union of both providers' listings for `season`: rich order first,
    /// live-only keys appended. A provider whose listing fails becomes a gap.
    pub async fn list_sessions(&self, season: i32) -> (Vec<SessionKey>, Vec<ListingGap>) {
        let listings = futures::future::join_all(self.adapters().map(|adapter| async move {
            (adapter.provider(), adapter.list_sessions(season).await)
        }))
        .await;

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut gaps = Vec::new();

        for (provider, listing) in listings {
            match listing {
                Ok(listed) => {
                    for key in listed {
                        if seen.insert(key.clone()) {
                            keys.push(key);
                        }
                    }
                }
                // The season is simply unknown to this provider
                Err(FetchError::NotFound(_)) => {
                    debug!(season, provider = %provider, "season not listed");
                }
                Err(err) => {
                    warn!(season, provider = %provider, error = %err, "season listing failed");
                    gaps.push(ListingGap {
                        season,
                        provider,
                        reason: skip_reason(&err),
                        detail: err.to_string(),
                    });
                }
            }
        }

        (keys, gaps)
    }

    /// Merged roster for one event; fails only when every provider fails
    pub async fn list_drivers(
        &self,
        season: i32,
        event: &EventId,
    ) -> Result<Vec<DriverInfo>, ProviderFailure> {
        let (rich, live) = tokio::join!(
            Self::roster_of(self.rich.as_ref(), season, event),
            Self::roster_of(self.live.as_ref(), season, event),
        );

        match (rich, live) {
            (Err(failure), Err(_)) => Err(failure),
            (rich, live) => Ok(paddock_engine::merge_rosters(
                rich.unwrap_or_default(),
                live.unwrap_or_default(),
            )),
        }
    }

    async fn roster_of(
        adapter: Option<&Arc<dyn ProviderAdapter>>,
        season: i32,
        event: &EventId,
    ) -> Result<Vec<DriverInfo>, ProviderFailure> {
        match adapter {
            Some(adapter) => adapter
                .list_drivers(season, event)
                .await
                .map_err(|err| ProviderFailure::new(adapter.provider(), err)),
            None => Err(ProviderFailure::new(
                Provider::Rich,
                FetchError::not_found("provider disabled"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_cache::CachePolicy;
    use paddock_testing::{LapBuilder, ScriptedAdapter};
    use paddock_types::Completeness;

    fn pipeline(rich: ScriptedAdapter, live: ScriptedAdapter) -> SessionPipeline {
        SessionPipeline::new(
            Some(Arc::new(rich)),
            Some(Arc::new(live)),
            SessionCache::in_memory(CachePolicy::default()),
            ReconcileConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_session_is_cached_after_first_fetch() {
        let rich = ScriptedAdapter::new(Provider::Rich).with_laps(
            "2023-monaco-race",
            vec![LapBuilder::new("VER", 1).time_ms(76_000).build()],
        );
        let pipeline = pipeline(rich, ScriptedAdapter::new(Provider::Live));
        let key: SessionKey = "2023-monaco-race".parse().unwrap();

        let (entry, outcome) = pipeline.session(&key, Freshness::PreferCached).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Fetched);
        assert_eq!(entry.bundle.completeness, Completeness::PartialRichOnly);

        let (_, outcome) = pipeline.session(&key, Freshness::PreferCached).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Hit);
    }

    #[tokio::test]
    async fn test_transient_failure_is_not_cached() {
        let rich = ScriptedAdapter::new(Provider::Rich).with_laps(
            "2023-monaco-race",
            vec![LapBuilder::new("VER", 1).time_ms(76_000).build()],
        );
        let live = ScriptedAdapter::new(Provider::Live)
            .with_error("2023-monaco-race", FetchError::unavailable("502"));
        let pipeline = pipeline(rich, live);
        let key: SessionKey = "2023-monaco-race".parse().unwrap();

        let failure = pipeline.session(&key, Freshness::PreferCached).await.unwrap_err();
        assert_eq!(failure.provider, Provider::Live);
        assert!(pipeline.cache().get(&key, Freshness::PreferCached).is_none());
    }

    #[tokio::test]
    async fn test_roster_attached_to_bundle() {
        let roster = vec![DriverInfo {
            code: "VER".parse().unwrap(),
            number: Some(1),
            name: None,
            team: Some("Red Bull Racing".to_string()),
        }];
        let rich = ScriptedAdapter::new(Provider::Rich)
            .with_laps(
                "2023-monaco-race",
                vec![LapBuilder::new("VER", 1).time_ms(76_000).build()],
            )
            .with_roster(2023, "monaco", roster);
        let pipeline = pipeline(rich, ScriptedAdapter::new(Provider::Live));
        let key: SessionKey = "2023-monaco-race".parse().unwrap();

        let (entry, _) = pipeline.session(&key, Freshness::PreferCached).await.unwrap();
        let ver = "VER".parse().unwrap();
        assert_eq!(entry.bundle.team_of(&ver), Some("Red Bull Racing"));
    }

    #[tokio::test]
    async fn test_listing_union_and_gaps() {
        let rich = ScriptedAdapter::new(Provider::Rich)
            .with_sessions(2022, &["2022-bahrain-race", "2022-monaco-race"]);
        let live = ScriptedAdapter::new(Provider::Live)
            .with_sessions(2022, &["2022-monaco-race", "2022-miami-race"])
            .with_listing_error(2021, FetchError::unavailable("timeout"));
        let pipeline = pipeline(rich, live);

        let (keys, gaps) = pipeline.list_sessions(2022).await;
        let names: Vec<String> = keys.iter().map(|k| k.canonical()).collect();
        assert_eq!(
            names,
            vec!["2022-bahrain-race", "2022-monaco-race", "2022-miami-race"]
        );
        assert!(gaps.is_empty());

        // Rich has no 2021 listing (NotFound) and live fails transiently
        let (keys, gaps) = pipeline.list_sessions(2021).await;
        assert!(keys.is_empty());
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].provider, Provider::Live);
    }
}
