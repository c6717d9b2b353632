use async_trait::async_trait;
use paddock_types::{DriverInfo, EventId, NormalizedRecord, Provider, SessionKey};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::traits::{FetchResult, ProviderAdapter};

/// Bounded exponential backoff for transient provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based), capped at `max_delay`
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Run `operation` until it succeeds, fails definitively, or attempts run out
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> FetchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if !err.is_transient() || attempt >= self.max_attempts {
                        return Err(err);
                    }

                    // Provider-supplied delay wins over the computed one
                    let delay = err
                        .suggested_retry_delay()
                        .unwrap_or_else(|| self.backoff(attempt - 1));
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient provider failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Decorator adding retries to every call of an inner adapter
pub struct Retrying<A> {
    inner: A,
    policy: RetryPolicy,
}

impl<A: ProviderAdapter> Retrying<A> {
    pub fn new(inner: A, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A: ProviderAdapter> ProviderAdapter for Retrying<A> {
    fn provider(&self) -> Provider {
        self.inner.provider()
    }

    async fn fetch_session(&self, key: &SessionKey) -> FetchResult<Vec<NormalizedRecord>> {
        let label = format!("{} fetch {}", self.provider(), key);
        self.policy
            .run(&label, || self.inner.fetch_session(key))
            .await
    }

    async fn list_sessions(&self, season: i32) -> FetchResult<Vec<SessionKey>> {
        let label = format!("{} list {}", self.provider(), season);
        self.policy
            .run(&label, || self.inner.list_sessions(season))
            .await
    }

    async fn list_drivers(&self, season: i32, event: &EventId) -> FetchResult<Vec<DriverInfo>> {
        let label = format!("{} drivers {} {}", self.provider(), season, event);
        self.policy
            .run(&label, || self.inner.list_drivers(season, event))
            .await
    }
}
