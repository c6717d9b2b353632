//! Scripted provider adapter.
//!
//! Returns canned outcomes per session key, optionally after a delay, and
//! counts every call so tests can assert on fetch deduplication, retries
//! and how many fetches ran at once.

use async_trait::async_trait;
use paddock_providers::{FetchResult, ProviderAdapter};
use paddock_types::{DriverInfo, EventId, FetchError, NormalizedRecord, Provider, SessionKey};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Outcome = FetchResult<Vec<NormalizedRecord>>;

pub struct ScriptedAdapter {
    provider: Provider,
    outcomes: Mutex<HashMap<String, Outcome>>,
    /// One-shot outcomes served before the steady one
    queued: Mutex<HashMap<String, VecDeque<Outcome>>>,
    delays: Mutex<HashMap<String, Duration>>,
    sessions: Mutex<HashMap<i32, FetchResult<Vec<SessionKey>>>>,
    rosters: Mutex<HashMap<String, Vec<DriverInfo>>>,
    fetches: Mutex<HashMap<String, usize>>,
    total_fetches: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight count on every exit path
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedAdapter {
    /// Adapter that answers `NotFound` for everything until scripted
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            outcomes: Mutex::new(HashMap::new()),
            queued: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            rosters: Mutex::new(HashMap::new()),
            fetches: Mutex::new(HashMap::new()),
            total_fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    fn parse(key: &str) -> SessionKey {
        key.parse().expect("valid session key")
    }

    pub fn with_laps(self, key: &str, laps: Vec<NormalizedRecord>) -> Self {
        self.set(key, Ok(laps));
        self
    }

    pub fn with_error(self, key: &str, error: FetchError) -> Self {
        self.set(key, Err(error));
        self
    }

    /// Fail `times` times with `error` before the steady outcome applies
    pub fn failing_first(self, key: &str, times: usize, error: FetchError) -> Self {
        let canonical = Self::parse(key).canonical();
        let mut queued = self.queued.lock().unwrap();
        let queue = queued.entry(canonical).or_default();
        for _ in 0..times {
            queue.push_back(Err(error.clone()));
        }
        drop(queued);
        self
    }

    pub fn with_delay(self, key: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(Self::parse(key).canonical(), delay);
        self
    }

    /// Listing for `season`; keys are served in the given order
    pub fn with_sessions(self, season: i32, keys: &[&str]) -> Self {
        let keys = keys.iter().map(|k| Self::parse(k)).collect();
        self.sessions.lock().unwrap().insert(season, Ok(keys));
        self
    }

    pub fn with_listing_error(self, season: i32, error: FetchError) -> Self {
        self.sessions.lock().unwrap().insert(season, Err(error));
        self
    }

    pub fn with_roster(self, season: i32, event: &str, roster: Vec<DriverInfo>) -> Self {
        self.rosters
            .lock()
            .unwrap()
            .insert(format!("{}-{}", season, event), roster);
        self
    }

    /// Replace the steady outcome for `key`
    pub fn set(&self, key: &str, outcome: Outcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(Self::parse(key).canonical(), outcome);
    }

    pub fn fetch_count(&self, key: &str) -> usize {
        let canonical = Self::parse(key).canonical();
        self.fetches
            .lock()
            .unwrap()
            .get(&canonical)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.total_fetches.load(Ordering::SeqCst)
    }

    /// Most `fetch_session` calls that were running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch_session(&self, key: &SessionKey) -> FetchResult<Vec<NormalizedRecord>> {
        let canonical = key.canonical();
        self.total_fetches.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(canonical.clone())
            .or_default() += 1;

        let delay = self.delays.lock().unwrap().get(&canonical).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&canonical)
            .and_then(|q| q.pop_front());
        if let Some(outcome) = queued {
            return outcome;
        }

        self.outcomes
            .lock()
            .unwrap()
            .get(&canonical)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::not_found(format!("{} not scripted", canonical))))
    }

    async fn list_sessions(&self, season: i32) -> FetchResult<Vec<SessionKey>> {
        self.sessions
            .lock()
            .unwrap()
            .get(&season)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::not_found(format!("season {}", season))))
    }

    async fn list_drivers(&self, season: i32, event: &EventId) -> FetchResult<Vec<DriverInfo>> {
        self.rosters
            .lock()
            .unwrap()
            .get(&format!("{}-{}", season, event))
            .cloned()
            .ok_or_else(|| FetchError::not_found(format!("{} {}", season, event)))
    }
}
