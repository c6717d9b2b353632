use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use paddock_types::{CacheEntry, ProviderFailure, SessionBundle, SessionKey};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{SqliteStore, StoreStats};

/// Lifecycle rules for cached bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Seasons at or after this one are still in progress and refreshable
    pub current_season: Option<i32>,
    /// Validity window for negative (empty) results
    pub empty_ttl: Duration,
    /// Age after which a current-season entry counts as stale
    pub refresh_after: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            current_season: None,
            empty_ttl: Duration::from_secs(15 * 60),
            refresh_after: Some(Duration::from_secs(6 * 60 * 60)),
        }
    }
}

impl CachePolicy {
    /// Entries that may legitimately change after being cached
    pub fn is_mutable(&self, entry: &CacheEntry) -> bool {
        entry.bundle.completeness.is_empty()
            || self
                .current_season
                .is_some_and(|current| entry.key.season >= current)
    }

    fn is_stale(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        if !self.is_mutable(entry) {
            return false;
        }
        match self.refresh_after.and_then(|d| chrono::Duration::from_std(d).ok()) {
            Some(limit) => now - entry.fetched_at >= limit,
            None => false,
        }
    }
}

/// Caller preference when a cached entry exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Freshness {
    /// Serve whatever is cached (fast path)
    #[default]
    PreferCached,
    /// Refetch mutable entries older than the policy's refresh window
    RefreshStale,
    /// Refetch mutable entries unconditionally
    ForceRefresh,
}

/// How a `get_or_fetch` call was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Fetched,
    Coalesced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub in_flight: usize,
    pub persisted: Option<StoreStats>,
}

type FetchOutcome = std::result::Result<CacheEntry, ProviderFailure>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct Inner {
    entries: Mutex<HashMap<SessionKey, CacheEntry>>,
    in_flight: Mutex<HashMap<SessionKey, SharedFetch>>,
    store: Option<SqliteStore>,
    policy: CachePolicy,
}

/// Session bundle cache shared by every pipeline in the process.
///
/// Cloning is cheap and clones share state. At most one fetch per key is
/// in flight; concurrent misses wait on the same shared future.
#[derive(Clone)]
pub struct SessionCache {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionCache {
    pub fn in_memory(policy: CachePolicy) -> Self {
        Self::build(None, policy)
    }

    pub fn with_store(store: SqliteStore, policy: CachePolicy) -> Self {
        Self::build(Some(store), policy)
    }

    fn build(store: Option<SqliteStore>, policy: CachePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                store,
                policy,
            }),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }

    /// Cached entry for `key`, or `None` on a miss.
    ///
    /// Expired negative entries and corrupt stored rows are dropped and
    /// reported as misses.
    pub fn get(&self, key: &SessionKey, freshness: Freshness) -> Option<CacheEntry> {
        let now = Utc::now();
        let policy = &self.inner.policy;

        let entry = match self.lookup(key, now) {
            Some(entry) => entry,
            None => {
                debug!(key = %key, "cache miss");
                return None;
            }
        };

        let refetch = match freshness {
            Freshness::PreferCached => false,
            Freshness::RefreshStale => policy.is_stale(&entry, now),
            Freshness::ForceRefresh => policy.is_mutable(&entry),
        };
        if refetch {
            debug!(key = %key, ?freshness, "cached entry bypassed for refresh");
            return None;
        }

        debug!(key = %key, completeness = %entry.bundle.completeness, "cache hit");
        Some(entry)
    }

    fn lookup(&self, key: &SessionKey, now: DateTime<Utc>) -> Option<CacheEntry> {
        let cached = lock(&self.inner.entries).get(key).cloned();
        let entry = match cached {
            Some(entry) => entry,
            None => {
                let loaded = self.load_persisted(key)?;
                lock(&self.inner.entries).insert(key.clone(), loaded.clone());
                loaded
            }
        };

        if entry.is_expired(now) {
            debug!(key = %key, "negative entry expired");
            self.invalidate(key);
            return None;
        }
        Some(entry)
    }

    fn load_persisted(&self, key: &SessionKey) -> Option<CacheEntry> {
        let store = self.inner.store.as_ref()?;
        let canonical = key.canonical();
        match store.load(&canonical) {
            Ok(entry) => entry,
            Err(err @ Error::Corruption { .. }) => {
                warn!(key = %key, error = %err, "dropping corrupt cache entry");
                if let Err(err) = store.delete(&canonical) {
                    warn!(key = %key, error = %err, "failed to delete corrupt cache entry");
                }
                None
            }
            Err(err) => {
                warn!(key = %key, error = %err, "cache store read failed");
                None
            }
        }
    }

    /// Store a reconciled bundle. Empty bundles get a short validity window.
    pub fn put(&self, bundle: SessionBundle) -> CacheEntry {
        let now = Utc::now();
        let expires_at = bundle
            .completeness
            .is_empty()
            .then(|| chrono::Duration::from_std(self.inner.policy.empty_ttl).ok())
            .flatten()
            .map(|ttl| now + ttl);

        let entry = CacheEntry {
            key: bundle.key.clone(),
            bundle,
            fetched_at: now,
            expires_at,
        };

        if let Some(store) = &self.inner.store
            && let Err(err) = store.save(&entry)
        {
            warn!(key = %entry.key, error = %err, "cache store write failed");
        }
        lock(&self.inner.entries).insert(entry.key.clone(), entry.clone());
        entry
    }

    /// Drop one entry from memory and the store. Returns whether anything
    /// was removed.
    pub fn invalidate(&self, key: &SessionKey) -> bool {
        let in_memory = lock(&self.inner.entries).remove(key).is_some();
        let persisted = match &self.inner.store {
            Some(store) => store.delete(&key.canonical()).unwrap_or_else(|err| {
                warn!(key = %key, error = %err, "cache store delete failed");
                false
            }),
            None => false,
        };
        if in_memory || persisted {
            info!(key = %key, "cache entry invalidated");
        }
        in_memory || persisted
    }

    /// Remove every entry. In-flight fetches still complete and repopulate.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = {
            let mut entries = lock(&self.inner.entries);
            let n = entries.len();
            entries.clear();
            n
        };
        if let Some(store) = &self.inner.store {
            removed = removed.max(store.clear()?);
        }
        info!(removed, "cache cleared");
        Ok(removed)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            memory_entries: lock(&self.inner.entries).len(),
            in_flight: lock(&self.inner.in_flight).len(),
            persisted: self.inner.store.as_ref().map(|s| s.stats()).transpose()?,
        })
    }

    /// Cached entry, or the result of `fetch` shared with every concurrent
    /// caller for the same key.
    ///
    /// Only successful fetches are stored. If every waiter is dropped the
    /// fetch is parked, and the next caller for the key resumes it.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &SessionKey,
        freshness: Freshness,
        fetch: F,
    ) -> std::result::Result<(CacheEntry, CacheOutcome), ProviderFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<SessionBundle, ProviderFailure>> + Send + 'static,
    {
        if let Some(entry) = self.get(key, freshness) {
            return Ok((entry, CacheOutcome::Hit));
        }

        let (shared, outcome) = {
            let mut in_flight = lock(&self.inner.in_flight);
            match in_flight.get(key) {
                Some(existing) => {
                    debug!(key = %key, "joining in-flight fetch");
                    (existing.clone(), CacheOutcome::Coalesced)
                }
                None => {
                    // A fetch may have finished between the miss and taking the lock
                    if freshness == Freshness::PreferCached
                        && let Some(entry) = lock(&self.inner.entries).get(key).cloned()
                    {
                        return Ok((entry, CacheOutcome::Hit));
                    }

                    let shared = self.shared_fetch(key.clone(), fetch());
                    in_flight.insert(key.clone(), shared.clone());
                    (shared, CacheOutcome::Fetched)
                }
            }
        };

        shared.await.map(|entry| (entry, outcome))
    }

    fn shared_fetch<Fut>(&self, key: SessionKey, fetch: Fut) -> SharedFetch
    where
        Fut: Future<Output = std::result::Result<SessionBundle, ProviderFailure>> + Send + 'static,
    {
        let cache = self.clone();
        async move {
            let result = fetch.await;
            let outcome = match result {
                Ok(bundle) => Ok(cache.put(bundle)),
                Err(failure) => {
                    warn!(key = %key, error = %failure, "fetch failed, not cached");
                    Err(failure)
                }
            };
            lock(&cache.inner.in_flight).remove(&key);
            outcome
        }
        .boxed()
        .shared()
    }
}
